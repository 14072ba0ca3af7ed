use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use super::codec::DecodedAudio;

/// Identifier for a scheduled playback source.
pub type SourceId = u64;

/// Output device abstraction: a monotonic sample clock plus scheduled
/// playback. The production implementation is `CpalSpeaker`; tests drive
/// the scheduler with a recording double.
pub trait OutputDevice: Send {
    /// Current position of the playback clock in seconds.
    fn now(&self) -> f64;

    /// Schedule mono samples to start at `at` seconds on the playback
    /// clock. The samples are at the rate the device was opened with.
    fn play_at(&mut self, samples: Vec<f32>, at: f64) -> Result<SourceId>;

    /// Stop a scheduled or playing source. Unknown ids are ignored.
    fn stop(&mut self, id: SourceId);

    /// Release the device.
    fn close(&mut self);
}

/// Gapless playback scheduler.
///
/// Keeps a watermark where the scheduled stream ends; each chunk starts at
/// the later of the watermark and the clock, so consecutive chunks play
/// back to back without gaps or overlap. If decoding falls behind the
/// clock, later chunks simply start when they arrive.
pub struct PlaybackScheduler {
    output: Box<dyn OutputDevice>,
    next_start: f64,
    active: HashSet<SourceId>,
}

impl PlaybackScheduler {
    pub fn new(output: Box<dyn OutputDevice>) -> Self {
        Self {
            output,
            next_start: 0.0,
            active: HashSet::new(),
        }
    }

    /// Queue decoded audio behind everything already scheduled.
    pub fn schedule(&mut self, audio: &DecodedAudio) -> Result<SourceId> {
        let start = self.next_start.max(self.output.now());
        let id = self.output.play_at(audio.mono(), start)?;
        self.next_start = start + audio.duration_secs();
        self.active.insert(id);
        Ok(id)
    }

    /// Deregister a source that played to completion.
    pub fn finished(&mut self, id: SourceId) {
        self.active.remove(&id);
    }

    /// Stop every active source and reset the timeline to zero. A no-op
    /// when nothing is scheduled; safe to call repeatedly.
    pub fn interrupt(&mut self) {
        if self.active.is_empty() && self.next_start == 0.0 {
            return;
        }
        debug!("interrupting {} active playback source(s)", self.active.len());
        for id in self.active.drain() {
            self.output.stop(id);
        }
        self.next_start = 0.0;
    }

    /// Interrupt and release the device.
    pub fn shutdown(&mut self) {
        self.interrupt();
        self.output.close();
    }

    /// Sources scheduled or playing right now.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Where the next chunk will start, in clock seconds.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }
}
