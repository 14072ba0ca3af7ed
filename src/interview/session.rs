//! Live interview session lifecycle.
//!
//! A session owns every resource it acquires: the capture device, the
//! playback scheduler, and the live connection. One control loop consumes
//! all inputs (live events, playback completions, the end signal) and is
//! the only place resources are released, so teardown runs exactly once
//! no matter how the interview ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::prompt::system_instruction;
use super::transcript::{classify, InterviewProgress};
use crate::audio::{
    decode_base64_chunk, encode_frame, CaptureDevice, CaptureFrame, DeviceFactory,
    PlaybackScheduler, SourceId,
};
use crate::error::AppError;
use crate::live::{LiveConnection, LiveConnector, ServerEvent, Setup};

/// Where a session is in its lifecycle. `Ended` only lasts while
/// resources are being released; settled sessions report `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Starting,
    InProgress,
    Ended,
}

/// Point-in-time snapshot of a session, served over the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewStatus {
    pub session_id: String,
    pub job_title: String,
    pub phase: SessionPhase,
    pub question_count: u32,
    pub current_question: Option<String>,
    pub feedback: Vec<String>,
    pub active_playback: usize,
    pub dropped_frames: u64,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub error: Option<String>,
}

#[derive(Debug)]
struct Shared {
    phase: SessionPhase,
    progress: InterviewProgress,
    active_playback: usize,
    error: Option<String>,
}

/// One mock interview over a live audio stream.
#[derive(Debug)]
pub struct InterviewSession {
    config: SessionConfig,
    started_at: DateTime<Utc>,
    shared: Arc<RwLock<Shared>>,
    dropped_frames: Arc<AtomicU64>,
    end_signal: Arc<Notify>,
    control_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl InterviewSession {
    /// Validate the configuration, acquire devices, open the live stream,
    /// and hand everything to the control loop. On any failure the
    /// resources acquired so far are released before the error returns.
    pub async fn start(
        config: SessionConfig,
        devices: &dyn DeviceFactory,
        connector: &dyn LiveConnector,
    ) -> Result<Self, AppError> {
        if config.job_title.trim().is_empty() {
            return Err(AppError::Validation("jobTitle is required".to_string()));
        }

        info!(
            "starting interview session {} for {:?}",
            config.session_id, config.job_title
        );

        let shared = Arc::new(RwLock::new(Shared {
            phase: SessionPhase::Starting,
            progress: InterviewProgress::new(config.total_questions, config.feedback_limit),
            active_playback: 0,
            error: None,
        }));

        // ====================================================================
        // Device acquisition
        // ====================================================================

        let mut capture = devices
            .open_capture(config.input_sample_rate, config.frame_samples)
            .map_err(|e| AppError::DeviceAccess(format!("microphone unavailable: {e}")))?;
        let frames = capture
            .start()
            .await
            .map_err(|e| AppError::DeviceAccess(format!("microphone unavailable: {e}")))?;

        let (output, done_rx) = match devices.open_output(config.output_sample_rate) {
            Ok(pair) => pair,
            Err(e) => {
                if let Err(stop_err) = capture.stop().await {
                    warn!("failed to stop capture during rollback: {stop_err}");
                }
                return Err(AppError::DeviceAccess(format!("speaker unavailable: {e}")));
            }
        };
        let mut scheduler = PlaybackScheduler::new(output);

        // ====================================================================
        // Live stream
        // ====================================================================

        let setup = Setup::new(
            &config.model,
            &config.voice,
            &system_instruction(&config.job_title, config.total_questions),
        );
        let connection = match connector.connect(setup).await {
            Ok(connection) => connection,
            Err(e) => {
                if let Err(stop_err) = capture.stop().await {
                    warn!("failed to stop capture during rollback: {stop_err}");
                }
                scheduler.shutdown();
                return Err(AppError::Transport(format!("live connection failed: {e}")));
            }
        };

        let dropped = Arc::new(AtomicU64::new(0));
        let forward =
            spawn_capture_forward(frames, connection.outbound.clone(), Arc::clone(&dropped));

        shared.write().await.phase = SessionPhase::InProgress;
        info!("interview session {} is live", config.session_id);

        let end_signal = Arc::new(Notify::new());
        let control = ControlLoop {
            session_id: config.session_id.clone(),
            output_sample_rate: config.output_sample_rate,
            shared: Arc::clone(&shared),
            end_signal: Arc::clone(&end_signal),
            resources: Some(Resources {
                capture,
                scheduler,
                connection,
                forward,
            }),
            done_rx,
        };
        let control_task = tokio::spawn(control.run());

        Ok(Self {
            config,
            started_at: Utc::now(),
            shared,
            dropped_frames: dropped,
            end_signal,
            control_task: Mutex::new(Some(control_task)),
        })
    }

    /// Ask the control loop to wind the session down and wait for it.
    /// Safe to call more than once; later calls return immediately.
    pub async fn end(&self) {
        self.end_signal.notify_one();
        let task = self.control_task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("interview control loop failed: {e}");
            }
        }
    }

    pub async fn status(&self) -> InterviewStatus {
        let shared = self.shared.read().await;
        InterviewStatus {
            session_id: self.config.session_id.clone(),
            job_title: self.config.job_title.clone(),
            phase: shared.phase,
            question_count: shared.progress.question_count(),
            current_question: shared.progress.current_question().map(str::to_string),
            feedback: shared.progress.feedback().iter().cloned().collect(),
            active_playback: shared.active_playback,
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            started_at: self.started_at,
            duration_secs: (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0,
            error: shared.error.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }
}

/// Forward captured frames to the transport. Frames already queued when
/// the transport opened are shed, and frames that find the outbound lane
/// full are counted and dropped rather than blocking capture.
fn spawn_capture_forward(
    mut frames: mpsc::Receiver<CaptureFrame>,
    outbound: mpsc::Sender<crate::audio::MediaChunk>,
    dropped: Arc<AtomicU64>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut stale: u64 = 0;
        while frames.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            dropped.fetch_add(stale, Ordering::Relaxed);
            debug!("shed {stale} frames captured before the transport opened");
        }

        let mut warned = false;
        while let Some(frame) = frames.recv().await {
            if outbound.try_send(encode_frame(&frame.samples)).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
                if !warned {
                    warn!("outbound transport is congested; dropping capture frames");
                    warned = true;
                }
            }
        }
        debug!("capture forwarding stopped");
    })
}

struct Resources {
    capture: Box<dyn CaptureDevice>,
    scheduler: PlaybackScheduler,
    connection: LiveConnection,
    forward: tokio::task::JoinHandle<()>,
}

enum LoopInput {
    End,
    Event(Option<ServerEvent>),
    Done(Option<SourceId>),
}

struct ControlLoop {
    session_id: String,
    output_sample_rate: u32,
    shared: Arc<RwLock<Shared>>,
    end_signal: Arc<Notify>,
    resources: Option<Resources>,
    done_rx: mpsc::UnboundedReceiver<SourceId>,
}

impl ControlLoop {
    async fn run(mut self) {
        loop {
            let input = {
                let res = match self.resources.as_mut() {
                    Some(res) => res,
                    None => break,
                };
                tokio::select! {
                    _ = self.end_signal.notified() => LoopInput::End,
                    event = res.connection.events.recv() => LoopInput::Event(event),
                    done = self.done_rx.recv() => LoopInput::Done(done),
                }
            };

            match input {
                LoopInput::End => {
                    info!("interview session {} ended by request", self.session_id);
                    self.teardown(None).await;
                    break;
                }
                LoopInput::Event(Some(event)) => {
                    if self.handle_event(event).await {
                        break;
                    }
                }
                LoopInput::Event(None) => {
                    warn!("live stream ended unexpectedly");
                    self.teardown(Some("live stream ended unexpectedly".to_string()))
                        .await;
                    break;
                }
                LoopInput::Done(Some(id)) => {
                    if let Some(res) = self.resources.as_mut() {
                        res.scheduler.finished(id);
                        let active = res.scheduler.active_count();
                        self.shared.write().await.active_playback = active;
                    }
                }
                LoopInput::Done(None) => {
                    warn!("audio output stopped unexpectedly");
                    self.teardown(Some("audio output stopped unexpectedly".to_string()))
                        .await;
                    break;
                }
            }
        }
    }

    /// React to one live event. Returns true when the session is over.
    async fn handle_event(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::SetupComplete => {
                debug!("late setup acknowledgement ignored");
                false
            }
            ServerEvent::TurnComplete => {
                debug!("model turn complete");
                false
            }
            ServerEvent::Audio { data } => {
                match decode_base64_chunk(&data, self.output_sample_rate, 1) {
                    Ok(audio) => {
                        if let Some(res) = self.resources.as_mut() {
                            match res.scheduler.schedule(&audio) {
                                Ok(id) => {
                                    let active = res.scheduler.active_count();
                                    debug!("scheduled playback source {id} ({active} active)");
                                    self.shared.write().await.active_playback = active;
                                }
                                Err(e) => warn!("failed to schedule playback: {e}"),
                            }
                        }
                    }
                    // One bad chunk is dropped; the stream continues.
                    Err(e) => warn!("dropping malformed audio chunk: {e}"),
                }
                false
            }
            ServerEvent::Interrupted => {
                if let Some(res) = self.resources.as_mut() {
                    res.scheduler.interrupt();
                    let active = res.scheduler.active_count();
                    self.shared.write().await.active_playback = active;
                }
                false
            }
            ServerEvent::Transcription { text } => match classify(&text) {
                Some(directive) => {
                    let concluded = self.shared.write().await.progress.apply(directive);
                    if concluded {
                        info!("interview session {} concluded by the model", self.session_id);
                        self.teardown(None).await;
                        true
                    } else {
                        false
                    }
                }
                None => {
                    debug!("transcript fragment without directive: {text:?}");
                    false
                }
            },
            ServerEvent::Closed => {
                self.teardown(Some("live stream closed unexpectedly".to_string()))
                    .await;
                true
            }
            ServerEvent::Error { message } => {
                error!("live stream error: {message}");
                self.teardown(Some(format!("live stream error: {message}")))
                    .await;
                true
            }
        }
    }

    /// Release everything exactly once. Capture stops first so the
    /// forwarding task drains and exits, then playback and the stream.
    async fn teardown(&mut self, error: Option<String>) {
        let Some(mut res) = self.resources.take() else {
            return;
        };
        self.shared.write().await.phase = SessionPhase::Ended;

        if let Err(e) = res.capture.stop().await {
            warn!("failed to stop capture: {e}");
        }
        if timeout(Duration::from_secs(2), &mut res.forward)
            .await
            .is_err()
        {
            res.forward.abort();
        }
        res.scheduler.shutdown();
        res.connection.close().await;

        let mut shared = self.shared.write().await;
        shared.active_playback = 0;
        shared.phase = SessionPhase::Idle;
        if let Some(message) = error {
            shared.error = Some(message);
        }
        drop(shared);

        info!("interview session {} resources released", self.session_id);
    }
}
