//! PCM wire codec: quantization, clamping, de-interleaving, and payload
//! validation.

use careerhub::audio::CodecError;
use careerhub::{decode_base64_chunk, decode_chunk, encode_frame, PCM_MIME_16K};

#[test]
fn round_trip_stays_within_quantization_error() {
    let samples: Vec<f32> = (0..480).map(|i| (i as f32 * 0.013).sin() * 0.8).collect();

    let chunk = encode_frame(&samples);
    assert_eq!(chunk.mime_type, PCM_MIME_16K);

    let decoded = decode_base64_chunk(&chunk.data, 16000, 1).unwrap();
    assert_eq!(decoded.channels.len(), 1);
    assert_eq!(decoded.frames(), samples.len());
    for (original, restored) in samples.iter().zip(&decoded.channels[0]) {
        assert!(
            (original - restored).abs() <= 1.0 / 32768.0 + 1e-7,
            "{original} decoded as {restored}"
        );
    }
}

#[test]
fn out_of_range_samples_saturate() {
    let chunk = encode_frame(&[2.0, -2.0, 1.0, -1.0]);
    let decoded = decode_base64_chunk(&chunk.data, 16000, 1).unwrap();

    let max = 32767.0 / 32768.0;
    let restored = &decoded.channels[0];
    assert!((restored[0] - max).abs() < 1e-6);
    assert!((restored[1] + 1.0).abs() < 1e-6);
    assert!((restored[2] - max).abs() < 1e-6);
    assert!((restored[3] + 1.0).abs() < 1e-6);
}

#[test]
fn odd_byte_count_is_malformed() {
    let err = decode_chunk(&[0, 1, 2], 16000, 1).unwrap_err();
    assert!(matches!(
        err,
        CodecError::MalformedPayload {
            len: 3,
            channels: 1
        }
    ));
}

#[test]
fn partial_stereo_frame_is_malformed() {
    // Six bytes is one and a half stereo frames.
    let err = decode_chunk(&[0; 6], 24000, 2).unwrap_err();
    assert!(matches!(
        err,
        CodecError::MalformedPayload {
            len: 6,
            channels: 2
        }
    ));
}

#[test]
fn stereo_payload_deinterleaves() {
    let mut bytes = Vec::new();
    for value in [100i16, -100, 200, -200] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let decoded = decode_chunk(&bytes, 24000, 2).unwrap();
    assert_eq!(decoded.frames(), 2);
    assert_eq!(
        decoded.channels[0],
        vec![100.0 / 32768.0, 200.0 / 32768.0]
    );
    assert_eq!(
        decoded.channels[1],
        vec![-100.0 / 32768.0, -200.0 / 32768.0]
    );
    assert!((decoded.duration_secs() - 2.0 / 24000.0).abs() < 1e-12);
}

#[test]
fn empty_payload_decodes_to_zero_frames() {
    let decoded = decode_chunk(&[], 16000, 1).unwrap();
    assert_eq!(decoded.frames(), 0);
    assert_eq!(decoded.duration_secs(), 0.0);
    assert!(decoded.mono().is_empty());
}

#[test]
fn garbage_base64_is_rejected() {
    let err = decode_base64_chunk("not base64!!!", 16000, 1).unwrap_err();
    assert!(matches!(err, CodecError::InvalidBase64(_)));
}

#[test]
fn mono_fold_averages_stereo_chunks() {
    let mut bytes = Vec::new();
    for value in [1000i16, 3000, -500, 500] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let decoded = decode_chunk(&bytes, 24000, 2).unwrap();
    let mono = decoded.mono();
    assert_eq!(mono.len(), 2);
    assert!((mono[0] - 2000.0 / 32768.0).abs() < 1e-6);
    assert!(mono[1].abs() < 1e-6);
}
