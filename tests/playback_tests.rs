//! Gapless scheduling, interruption, and shutdown of model speech
//! playback.

use std::sync::{Arc, Mutex};

use careerhub::audio::DecodedAudio;
use careerhub::{OutputDevice, PlaybackScheduler, SourceId};

#[derive(Default)]
struct MockOutputState {
    clock: f64,
    next_id: SourceId,
    started: Vec<(SourceId, f64, usize)>,
    stopped: Vec<SourceId>,
    closes: usize,
}

#[derive(Clone, Default)]
struct MockOutput {
    state: Arc<Mutex<MockOutputState>>,
}

impl OutputDevice for MockOutput {
    fn now(&self) -> f64 {
        self.state.lock().unwrap().clock
    }

    fn play_at(&mut self, samples: Vec<f32>, at: f64) -> anyhow::Result<SourceId> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.started.push((id, at, samples.len()));
        Ok(id)
    }

    fn stop(&mut self, id: SourceId) {
        self.state.lock().unwrap().stopped.push(id);
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closes += 1;
    }
}

fn chunk_of(frames: usize, rate: u32) -> DecodedAudio {
    DecodedAudio {
        channels: vec![vec![0.1; frames]],
        sample_rate: rate,
    }
}

#[test]
fn consecutive_chunks_schedule_back_to_back() {
    let output = MockOutput::default();
    let state = output.state.clone();
    let mut scheduler = PlaybackScheduler::new(Box::new(output));

    // Three one-second chunks at 24 kHz.
    for _ in 0..3 {
        scheduler.schedule(&chunk_of(24000, 24000)).unwrap();
    }

    let starts: Vec<f64> = state.lock().unwrap().started.iter().map(|s| s.1).collect();
    assert_eq!(starts, vec![0.0, 1.0, 2.0]);
    assert_eq!(scheduler.active_count(), 3);
    assert!((scheduler.next_start() - 3.0).abs() < 1e-9);
}

#[test]
fn chunk_behind_the_clock_starts_now() {
    let output = MockOutput::default();
    let state = output.state.clone();
    let mut scheduler = PlaybackScheduler::new(Box::new(output));

    scheduler.schedule(&chunk_of(2400, 24000)).unwrap();
    // Playback ran past the scheduled chunk before the next one decoded.
    state.lock().unwrap().clock = 5.0;
    scheduler.schedule(&chunk_of(2400, 24000)).unwrap();

    let starts: Vec<f64> = state.lock().unwrap().started.iter().map(|s| s.1).collect();
    assert_eq!(starts[0], 0.0);
    assert_eq!(starts[1], 5.0);
    assert!((scheduler.next_start() - 5.1).abs() < 1e-9);
}

#[test]
fn interrupt_stops_everything_and_resets_the_timeline() {
    let output = MockOutput::default();
    let state = output.state.clone();
    let mut scheduler = PlaybackScheduler::new(Box::new(output));

    let first = scheduler.schedule(&chunk_of(24000, 24000)).unwrap();
    let second = scheduler.schedule(&chunk_of(24000, 24000)).unwrap();

    scheduler.interrupt();

    {
        let state = state.lock().unwrap();
        let mut stopped = state.stopped.clone();
        stopped.sort_unstable();
        assert_eq!(stopped, vec![first, second]);
    }
    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.next_start(), 0.0);

    // A second interrupt has nothing to do.
    scheduler.interrupt();
    assert_eq!(state.lock().unwrap().stopped.len(), 2);
}

#[test]
fn finished_source_leaves_the_watermark_alone() {
    let output = MockOutput::default();
    let mut scheduler = PlaybackScheduler::new(Box::new(output));

    let id = scheduler.schedule(&chunk_of(24000, 24000)).unwrap();
    scheduler.finished(id);

    assert_eq!(scheduler.active_count(), 0);
    assert!((scheduler.next_start() - 1.0).abs() < 1e-9);
}

#[test]
fn shutdown_interrupts_and_releases_the_device() {
    let output = MockOutput::default();
    let state = output.state.clone();
    let mut scheduler = PlaybackScheduler::new(Box::new(output));

    scheduler.schedule(&chunk_of(2400, 24000)).unwrap();
    scheduler.shutdown();

    let state = state.lock().unwrap();
    assert_eq!(state.stopped.len(), 1);
    assert_eq!(state.closes, 1);
}
