use anyhow::Result;
use tokio::sync::mpsc;

/// Samples per capture frame sent upstream (256 ms at 16 kHz).
pub const FRAME_SAMPLES: usize = 4096;

/// One fixed-size block of mono f32 samples from the capture device.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub samples: Vec<f32>,
}

/// Microphone capture trait
///
/// Implementations:
/// - `CpalMicrophone`: the host's default input device
/// - `WavCapture`: replay a WAV file (demos / batch processing)
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the device and start capturing
    ///
    /// Returns a channel receiver that will receive fixed-size frames
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if the device is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Re-blocks arbitrary callback slices into fixed-size frames.
///
/// Device callbacks deliver whatever block size the driver picked; the
/// remainder carries over to the next call.
pub struct FrameChunker {
    frame_samples: usize,
    pending: Vec<f32>,
}

impl FrameChunker {
    pub fn new(frame_samples: usize) -> Self {
        Self {
            frame_samples,
            pending: Vec::with_capacity(frame_samples),
        }
    }

    /// Append samples, returning every completed frame.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            frames.push(std::mem::replace(&mut self.pending, rest));
        }
        frames
    }

    /// Samples currently buffered below one frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Average interleaved multi-channel samples down to mono.
pub(crate) fn fold_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Naive linear-interpolation resampler, adequate for speech.
pub(crate) fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let a = samples[idx];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunker_carries_remainder_across_pushes() {
        let mut chunker = FrameChunker::new(4096);

        assert!(chunker.push(&vec![0.1; 1000]).is_empty());
        assert_eq!(chunker.pending_len(), 1000);

        let frames = chunker.push(&vec![0.2; 5000]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 4096);
        assert_eq!(chunker.pending_len(), 1904);

        let frames = chunker.push(&vec![0.3; 2192]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 4096);
        assert_eq!(chunker.pending_len(), 0);
    }

    #[test]
    fn chunker_splits_oversized_blocks() {
        let mut chunker = FrameChunker::new(100);
        let frames = chunker.push(&vec![0.0; 350]);
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.len() == 100));
        assert_eq!(chunker.pending_len(), 50);
    }

    #[test]
    fn chunker_preserves_sample_order() {
        let mut chunker = FrameChunker::new(4);
        let input: Vec<f32> = (0..6).map(|i| i as f32).collect();
        let frames = chunker.push(&input);
        assert_eq!(frames, vec![vec![0.0, 1.0, 2.0, 3.0]]);
        let frames = chunker.push(&[6.0, 7.0]);
        assert_eq!(frames, vec![vec![4.0, 5.0, 6.0, 7.0]]);
    }

    #[test]
    fn fold_mono_averages_channels() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(fold_mono(&stereo, 2), vec![0.5, 0.5, 0.0]);
        assert_eq!(fold_mono(&stereo, 1), stereo.to_vec());
    }

    #[test]
    fn resample_halves_and_preserves_rate_match() {
        let input: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let out = resample_linear(&input, 32000, 16000);
        assert_eq!(out.len(), 50);
        // Every output sample lands on an even input index.
        assert!((out[10] - 20.0).abs() < 1e-6);

        let same = resample_linear(&input, 16000, 16000);
        assert_eq!(same, input);
    }

    #[test]
    fn resample_interpolates_between_samples() {
        let input = [0.0, 1.0];
        let out = resample_linear(&input, 16000, 32000);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }
}
