//! PCM codec for the live audio wire format.
//!
//! Microphone samples go upstream as 16-bit little-endian PCM wrapped in
//! base64; model speech comes back the same way. Quantization rounds and
//! clamps to the i16 range, so a round trip loses at most 1/32768 per
//! sample.

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MIME tag for microphone audio sent upstream (16 kHz mono PCM).
pub const PCM_MIME_16K: &str = "audio/pcm;rate=16000";

/// Errors from the PCM codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Byte length is not a whole number of sample frames.
    #[error("malformed PCM payload: {len} bytes does not divide into {channels}-channel frames")]
    MalformedPayload { len: usize, channels: u16 },

    /// Base64 payload could not be decoded.
    #[error("invalid base64 audio payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// A base64-encoded PCM chunk tagged with its MIME type, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    /// Base64 of the little-endian PCM bytes.
    pub data: String,
    /// MIME tag carrying the sample rate, e.g. `audio/pcm;rate=16000`.
    pub mime_type: String,
}

/// Decoded audio with one buffer per channel.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Fold all channels down to a single mono buffer by averaging.
    pub fn mono(&self) -> Vec<f32> {
        match self.channels.len() {
            0 => Vec::new(),
            1 => self.channels[0].clone(),
            n => {
                let frames = self.frames();
                (0..frames)
                    .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() / n as f32)
                    .collect()
            }
        }
    }
}

/// Encode f32 samples as 16-bit little-endian PCM wrapped in base64.
///
/// Samples are quantized with `round(sample * 32768)` and clamped to the
/// i16 range, so out-of-range input saturates instead of wrapping.
pub fn encode_frame(samples: &[f32]) -> MediaChunk {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let quantized = (sample * 32768.0)
            .round()
            .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&quantized.to_le_bytes());
    }

    MediaChunk {
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        mime_type: PCM_MIME_16K.to_string(),
    }
}

/// Decode raw little-endian PCM bytes into per-channel f32 buffers.
///
/// The byte length must divide evenly into `channel_count` 16-bit frames;
/// anything else is a malformed payload. An empty payload decodes to zero
/// frames.
pub fn decode_chunk(
    bytes: &[u8],
    sample_rate: u32,
    channel_count: u16,
) -> Result<DecodedAudio, CodecError> {
    let frame_bytes = channel_count as usize * 2;
    if frame_bytes == 0 || bytes.len() % frame_bytes != 0 {
        return Err(CodecError::MalformedPayload {
            len: bytes.len(),
            channels: channel_count,
        });
    }

    let frames = bytes.len() / frame_bytes;
    let mut channels: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(frames))
        .collect();

    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let sample = i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0;
        channels[i % channel_count as usize].push(sample);
    }

    Ok(DecodedAudio {
        channels,
        sample_rate,
    })
}

/// Decode a base64 chunk straight off the wire.
pub fn decode_base64_chunk(
    data: &str,
    sample_rate: u32,
    channel_count: u16,
) -> Result<DecodedAudio, CodecError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
    decode_chunk(&bytes, sample_rate, channel_count)
}
