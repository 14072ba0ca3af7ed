//! WAV-file capture device for demos and tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::capture::{fold_mono, resample_linear, CaptureDevice, CaptureFrame};

/// Plays a WAV file through the capture interface, standing in for a
/// microphone. With `realtime` set, frames are paced at the frame
/// duration; otherwise they are delivered as fast as the channel drains.
pub struct WavCapture {
    path: PathBuf,
    target_rate: u32,
    frame_samples: usize,
    realtime: bool,
    capturing: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
    name: String,
}

impl WavCapture {
    pub fn new(
        path: impl Into<PathBuf>,
        target_rate: u32,
        frame_samples: usize,
        realtime: bool,
    ) -> Self {
        let path = path.into();
        let name = format!("wav:{}", path.display());
        Self {
            path,
            target_rate,
            frame_samples,
            realtime,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
            name,
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for WavCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>> {
        let mut reader = hound::WavReader::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => reader
                .samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .context("failed to read audio samples")?
                .into_iter()
                .map(|s| s as f32 / 32768.0)
                .collect(),
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("failed to read audio samples")?,
        };

        let mono = fold_mono(&interleaved, spec.channels as usize);
        let samples = if spec.sample_rate == self.target_rate {
            mono
        } else {
            resample_linear(&mono, spec.sample_rate, self.target_rate)
        };

        info!(
            "wav capture started: {} ({} samples at {} Hz)",
            self.path.display(),
            samples.len(),
            self.target_rate
        );

        let (tx, rx) = mpsc::channel(32);
        let frame_samples = self.frame_samples;
        let frame_secs = frame_samples as f64 / self.target_rate as f64;
        let realtime = self.realtime;
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::Relaxed);

        let task = tokio::spawn(async move {
            // A trailing partial frame is dropped; the consumer only
            // takes fixed-size frames.
            for chunk in samples.chunks_exact(frame_samples) {
                if !capturing.load(Ordering::Relaxed) {
                    break;
                }
                if tx
                    .send(CaptureFrame {
                        samples: chunk.to_vec(),
                    })
                    .await
                    .is_err()
                {
                    break;
                }
                if realtime {
                    tokio::time::sleep(Duration::from_secs_f64(frame_secs)).await;
                }
            }
            capturing.store(false, Ordering::Relaxed);
            debug!("wav capture finished");
        });
        self.task = Some(task);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Relaxed)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
