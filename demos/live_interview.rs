//! Run a mock interview against the live API, using a WAV file as the
//! microphone and the real speaker for model audio.
//!
//! Usage:
//!   GEMINI_API_KEY=... cargo run --example live_interview -- \
//!       --wav answers.wav --job-title "Backend Engineer"

use anyhow::{Context, Result};
use careerhub::{
    CaptureDevice, CpalSpeaker, DeviceFactory, GeminiLive, InterviewSession, OutputDevice,
    SessionConfig, SessionPhase, SourceId, WavCapture,
};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

#[derive(Parser, Debug)]
struct Args {
    /// WAV file standing in for the microphone
    #[arg(long)]
    wav: String,

    /// Position to interview for
    #[arg(long, default_value = "Software Engineer")]
    job_title: String,
}

/// WAV in, real speaker out.
struct WavDeviceFactory {
    wav: String,
}

impl DeviceFactory for WavDeviceFactory {
    fn open_capture(
        &self,
        sample_rate: u32,
        frame_samples: usize,
    ) -> Result<Box<dyn CaptureDevice>> {
        Ok(Box::new(WavCapture::new(
            self.wav.clone(),
            sample_rate,
            frame_samples,
            true,
        )))
    }

    fn open_output(
        &self,
        sample_rate: u32,
    ) -> Result<(Box<dyn OutputDevice>, mpsc::UnboundedReceiver<SourceId>)> {
        let (speaker, done_rx) = CpalSpeaker::open(sample_rate)?;
        Ok((Box::new(speaker), done_rx))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;
    let connector = GeminiLive::new(LIVE_ENDPOINT, &api_key);
    let devices = WavDeviceFactory { wav: args.wav };

    let config = SessionConfig::new(args.job_title);
    let session = InterviewSession::start(config, &devices, &connector).await?;
    info!("interview {} started; ctrl-c to end early", session.id());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.end().await;
                break;
            }
            _ = tokio::time::sleep(std::time::Duration::from_secs(2)) => {
                let status = session.status().await;
                info!(
                    "phase {:?}, question {} ({:?}), {} active playback sources",
                    status.phase, status.question_count, status.current_question,
                    status.active_playback
                );
                if status.phase == SessionPhase::Idle {
                    break;
                }
            }
        }
    }

    let status = session.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
