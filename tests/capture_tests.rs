//! WAV capture device framing and resampling.

use careerhub::{CaptureDevice, WavCapture, FRAME_SAMPLES};

fn write_wav(path: &std::path::Path, sample_rate: u32, samples: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..samples {
        writer.write_sample((i % 1000) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[tokio::test]
async fn emits_fixed_frames_and_drops_the_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.wav");
    write_wav(&path, 16000, 2 * FRAME_SAMPLES + 100);

    let mut capture = WavCapture::new(&path, 16000, FRAME_SAMPLES, false);
    assert!(capture.name().starts_with("wav:"));

    let mut frames = capture.start().await.unwrap();

    let first = frames.recv().await.unwrap();
    let second = frames.recv().await.unwrap();
    assert_eq!(first.samples.len(), FRAME_SAMPLES);
    assert_eq!(second.samples.len(), FRAME_SAMPLES);
    assert!((first.samples[1] - 1.0 / 32768.0).abs() < 1e-6);

    // The 100-sample tail is less than a frame and never arrives.
    assert!(frames.recv().await.is_none());
    assert!(!capture.is_capturing());

    capture.stop().await.unwrap();
}

#[tokio::test]
async fn resamples_to_the_target_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wideband.wav");
    write_wav(&path, 32000, 2 * FRAME_SAMPLES);

    let mut capture = WavCapture::new(&path, 16000, FRAME_SAMPLES, false);
    let mut frames = capture.start().await.unwrap();

    // 8192 samples at 32 kHz become 4096 at 16 kHz: exactly one frame.
    let frame = frames.recv().await.unwrap();
    assert_eq!(frame.samples.len(), FRAME_SAMPLES);
    assert!(frames.recv().await.is_none());

    capture.stop().await.unwrap();
}

#[tokio::test]
async fn stopping_closes_the_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.wav");
    write_wav(&path, 16000, 10 * FRAME_SAMPLES);

    let mut capture = WavCapture::new(&path, 16000, FRAME_SAMPLES, true);
    let mut frames = capture.start().await.unwrap();
    assert!(capture.is_capturing());

    let _first = frames.recv().await.unwrap();
    capture.stop().await.unwrap();
    assert!(!capture.is_capturing());

    // Whatever was in flight drains, then the channel closes.
    while frames.recv().await.is_some() {}
}
