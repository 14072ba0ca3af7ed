//! cpal-backed microphone and speaker.
//!
//! cpal stream handles are not `Send`, so each device runs on a dedicated
//! thread that owns the stream. The async side only sees channels and
//! atomics: frames out of the microphone, commands and a sample-counter
//! clock into the speaker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::capture::{fold_mono, resample_linear, CaptureDevice, CaptureFrame, FrameChunker};
use super::playback::{OutputDevice, SourceId};

/// Frames buffered between the capture callback and the forwarding task.
const FRAME_CHANNEL_CAPACITY: usize = 32;

/// How long to wait for a device thread to come up.
const DEVICE_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the audio endpoints a session needs. The production factory
/// talks to the host's default devices; tests substitute scripted ones.
pub trait DeviceFactory: Send + Sync {
    /// Open the microphone for mono capture at `sample_rate`.
    fn open_capture(
        &self,
        sample_rate: u32,
        frame_samples: usize,
    ) -> Result<Box<dyn CaptureDevice>>;

    /// Open the speaker for buffers at `sample_rate`. Returns the device
    /// handle and the channel on which finished source ids arrive.
    fn open_output(
        &self,
        sample_rate: u32,
    ) -> Result<(Box<dyn OutputDevice>, mpsc::UnboundedReceiver<SourceId>)>;
}

/// Factory for the host's default input and output devices.
pub struct CpalDeviceFactory;

impl DeviceFactory for CpalDeviceFactory {
    fn open_capture(
        &self,
        sample_rate: u32,
        frame_samples: usize,
    ) -> Result<Box<dyn CaptureDevice>> {
        Ok(Box::new(CpalMicrophone::new(sample_rate, frame_samples)))
    }

    fn open_output(
        &self,
        sample_rate: u32,
    ) -> Result<(Box<dyn OutputDevice>, mpsc::UnboundedReceiver<SourceId>)> {
        let (speaker, done_rx) = CpalSpeaker::open(sample_rate)?;
        Ok((Box::new(speaker), done_rx))
    }
}

// ============================================================================
// Microphone
// ============================================================================

/// Default-microphone capture through cpal.
///
/// The capture callback folds to mono, resamples to the target rate, and
/// hands completed frames to a bounded channel with `try_send`. It never
/// blocks; frames that find the channel full are counted and dropped.
pub struct CpalMicrophone {
    target_rate: u32,
    frame_samples: usize,
    name: String,
    capturing: bool,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl CpalMicrophone {
    pub fn new(target_rate: u32, frame_samples: usize) -> Self {
        Self {
            target_rate,
            frame_samples,
            name: "default microphone".to_string(),
            capturing: false,
            stop_tx: None,
            thread: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Frames lost to a full channel since capture started.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for CpalMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>> {
        if self.capturing {
            anyhow::bail!("capture already started");
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();

        let target_rate = self.target_rate;
        let frame_samples = self.frame_samples;
        let dropped = Arc::clone(&self.dropped);

        let thread = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                run_input_thread(ready_tx, stop_rx, frame_tx, target_rate, frame_samples, dropped)
            })
            .context("failed to spawn capture thread")?;

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv_timeout(DEVICE_READY_TIMEOUT))
            .await
            .context("capture thread startup was cancelled")?
            .context("capture thread did not report readiness")?;

        match ready {
            Ok(name) => {
                info!("microphone capture started: {name}");
                self.name = name;
                self.capturing = true;
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                Ok(frame_rx)
            }
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }
        self.capturing = false;

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }

        info!("microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Owns the input stream for its whole lifetime; parks until told to stop.
fn run_input_thread(
    ready_tx: std_mpsc::Sender<Result<String>>,
    stop_rx: std_mpsc::Receiver<()>,
    frame_tx: mpsc::Sender<CaptureFrame>,
    target_rate: u32,
    frame_samples: usize,
    dropped: Arc<AtomicU64>,
) {
    let built = (|| -> Result<(cpal::Stream, String)> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("no default input device; check microphone permissions")?;
        let name = device
            .name()
            .unwrap_or_else(|_| "unknown input".to_string());
        let supported = device
            .default_input_config()
            .context("failed to read default input config")?;

        let channels = supported.channels() as usize;
        let source_rate = supported.sample_rate().0;
        let stream_config: cpal::StreamConfig = supported.config();
        let mut chunker = FrameChunker::new(frame_samples);

        let err_fn = |e| warn!("input stream error: {e}");

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    push_captured(
                        data,
                        channels,
                        source_rate,
                        target_rate,
                        &mut chunker,
                        &frame_tx,
                        &dropped,
                    );
                },
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let as_f32: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                    push_captured(
                        &as_f32,
                        channels,
                        source_rate,
                        target_rate,
                        &mut chunker,
                        &frame_tx,
                        &dropped,
                    );
                },
                err_fn,
                None,
            )?,
            other => anyhow::bail!("unsupported input sample format: {other:?}"),
        };

        stream.play().context("failed to start input stream")?;
        Ok((stream, name))
    })();

    match built {
        Ok((stream, name)) => {
            let _ = ready_tx.send(Ok(name));
            // Parks here; the stream keeps capturing until we drop it.
            let _ = stop_rx.recv();
            drop(stream);
            debug!("capture thread exiting");
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

fn push_captured(
    data: &[f32],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
    chunker: &mut FrameChunker,
    frame_tx: &mpsc::Sender<CaptureFrame>,
    dropped: &AtomicU64,
) {
    let mono = fold_mono(data, channels);
    let resampled = if source_rate == target_rate {
        mono
    } else {
        resample_linear(&mono, source_rate, target_rate)
    };

    for samples in chunker.push(&resampled) {
        if frame_tx.try_send(CaptureFrame { samples }).is_err() {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// ============================================================================
// Speaker
// ============================================================================

enum SpeakerCommand {
    Play {
        id: SourceId,
        start_frame: u64,
        samples: Vec<f32>,
    },
    Stop {
        id: SourceId,
    },
}

/// Speaker output through cpal with sample-accurate scheduling.
///
/// The device runs at its own default rate; buffers handed to `play_at`
/// are resampled from `source_rate` on the caller's thread, never in the
/// audio callback. The clock is the count of frames the callback has
/// written, which makes it monotonic by construction.
pub struct CpalSpeaker {
    device_rate: u32,
    source_rate: u32,
    clock_frames: Arc<AtomicU64>,
    cmd_tx: std_mpsc::Sender<SpeakerCommand>,
    close_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
    next_id: SourceId,
}

impl CpalSpeaker {
    /// Open the default output device for buffers at `source_rate`.
    /// Returns the handle plus the channel on which finished source ids
    /// arrive.
    pub fn open(source_rate: u32) -> Result<(Self, mpsc::UnboundedReceiver<SourceId>)> {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = std_mpsc::channel();
        let (close_tx, close_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let clock_frames = Arc::new(AtomicU64::new(0));
        let clock_thread = Arc::clone(&clock_frames);

        let thread = std::thread::Builder::new()
            .name("speaker-output".to_string())
            .spawn(move || run_output_thread(ready_tx, close_rx, cmd_rx, done_tx, clock_thread))
            .context("failed to spawn speaker thread")?;

        let ready = ready_rx
            .recv_timeout(DEVICE_READY_TIMEOUT)
            .context("speaker thread did not report readiness")?;
        let device_rate = match ready {
            Ok(rate) => rate,
            Err(e) => {
                let _ = thread.join();
                return Err(e);
            }
        };

        info!("speaker output opened at {device_rate} Hz");

        Ok((
            Self {
                device_rate,
                source_rate,
                clock_frames,
                cmd_tx,
                close_tx: Some(close_tx),
                thread: Some(thread),
                next_id: 0,
            },
            done_rx,
        ))
    }
}

impl OutputDevice for CpalSpeaker {
    fn now(&self) -> f64 {
        self.clock_frames.load(Ordering::Relaxed) as f64 / self.device_rate as f64
    }

    fn play_at(&mut self, samples: Vec<f32>, at: f64) -> Result<SourceId> {
        let samples = if self.source_rate == self.device_rate {
            samples
        } else {
            resample_linear(&samples, self.source_rate, self.device_rate)
        };

        let id = self.next_id;
        self.next_id += 1;
        let start_frame = (at * self.device_rate as f64).round() as u64;

        self.cmd_tx
            .send(SpeakerCommand::Play {
                id,
                start_frame,
                samples,
            })
            .map_err(|_| anyhow::anyhow!("speaker thread is gone"))?;
        Ok(id)
    }

    fn stop(&mut self, id: SourceId) {
        let _ = self.cmd_tx.send(SpeakerCommand::Stop { id });
    }

    fn close(&mut self) {
        // Dropping the close sender wakes the thread out of its park.
        self.close_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalSpeaker {
    fn drop(&mut self) {
        self.close();
    }
}

struct Voice {
    id: SourceId,
    start_frame: u64,
    samples: Vec<f32>,
}

/// Mixer state owned by the output callback.
struct MixState {
    cmd_rx: std_mpsc::Receiver<SpeakerCommand>,
    done_tx: mpsc::UnboundedSender<SourceId>,
    clock_frames: Arc<AtomicU64>,
    voices: Vec<Voice>,
    scratch: Vec<f32>,
}

impl MixState {
    /// Render `frames` mono frames into the scratch buffer, advancing the
    /// clock and retiring voices that finished inside this block.
    fn render(&mut self, frames: usize) -> &[f32] {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            match cmd {
                SpeakerCommand::Play {
                    id,
                    start_frame,
                    samples,
                } => self.voices.push(Voice {
                    id,
                    start_frame,
                    samples,
                }),
                SpeakerCommand::Stop { id } => self.voices.retain(|v| v.id != id),
            }
        }

        let start = self.clock_frames.load(Ordering::Relaxed);
        self.scratch.clear();
        self.scratch.resize(frames, 0.0);

        for voice in &self.voices {
            let voice_end = voice.start_frame + voice.samples.len() as u64;
            let begin = voice.start_frame.max(start);
            let end = voice_end.min(start + frames as u64);
            if begin >= end {
                continue;
            }
            let out_off = (begin - start) as usize;
            let src_off = (begin - voice.start_frame) as usize;
            let count = (end - begin) as usize;
            for i in 0..count {
                self.scratch[out_off + i] += voice.samples[src_off + i];
            }
        }

        let advanced = start + frames as u64;
        self.clock_frames.store(advanced, Ordering::Relaxed);

        let done_tx = &self.done_tx;
        self.voices.retain(|v| {
            let finished = v.start_frame + v.samples.len() as u64 <= advanced;
            if finished {
                let _ = done_tx.send(v.id);
            }
            !finished
        });

        &self.scratch
    }
}

fn run_output_thread(
    ready_tx: std_mpsc::Sender<Result<u32>>,
    close_rx: std_mpsc::Receiver<()>,
    cmd_rx: std_mpsc::Receiver<SpeakerCommand>,
    done_tx: mpsc::UnboundedSender<SourceId>,
    clock_frames: Arc<AtomicU64>,
) {
    let built = (|| -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no default output device")?;
        let supported = device
            .default_output_config()
            .context("failed to read default output config")?;

        let channels = supported.channels() as usize;
        let device_rate = supported.sample_rate().0;
        let stream_config: cpal::StreamConfig = supported.config();

        let mut mix = MixState {
            cmd_rx,
            done_tx,
            clock_frames,
            voices: Vec::new(),
            scratch: Vec::new(),
        };

        let err_fn = |e| warn!("output stream error: {e}");

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    let rendered = mix.render(frames);
                    for (i, frame) in data.chunks_mut(channels).enumerate() {
                        for sample in frame.iter_mut() {
                            *sample = rendered[i];
                        }
                    }
                },
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I16 => device.build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    let rendered = mix.render(frames);
                    for (i, frame) in data.chunks_mut(channels).enumerate() {
                        let value = (rendered[i].clamp(-1.0, 1.0) * 32767.0) as i16;
                        for sample in frame.iter_mut() {
                            *sample = value;
                        }
                    }
                },
                err_fn,
                None,
            )?,
            other => anyhow::bail!("unsupported output sample format: {other:?}"),
        };

        stream.play().context("failed to start output stream")?;
        Ok((stream, device_rate))
    })();

    match built {
        Ok((stream, device_rate)) => {
            let _ = ready_tx.send(Ok(device_rate));
            // Parks here; playback runs until the handle closes.
            let _ = close_rx.recv();
            drop(stream);
            debug!("speaker thread exiting");
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}
