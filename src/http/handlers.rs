use super::state::AppState;
use crate::analysis::{ResumeAnalysis, UploadedDocument};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::interview::{InterviewSession, InterviewStatus, SessionConfig, SessionPhase};
use crate::resume::{ResumeData, StoredResume};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInterviewRequest {
    /// Position the mock interview is for
    #[serde(default)]
    pub job_title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInterviewResponse {
    pub interview_id: String,
    pub status: InterviewStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndInterviewResponse {
    pub interview_id: String,
    pub status: InterviewStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResumeRequest {
    pub content: Option<ResumeData>,
}

// ============================================================================
// Interview Handlers
// ============================================================================

/// POST /api/interview/start
/// Start a mock interview session
pub async fn start_interview(
    State(state): State<AppState>,
    Json(req): Json<StartInterviewRequest>,
) -> Result<Json<StartInterviewResponse>, AppError> {
    info!("Starting interview for job title: {:?}", req.job_title);

    // One live interview at a time; settled sessions are swept here.
    let mut sessions = state.sessions.write().await;
    let mut stale = Vec::new();
    for (id, session) in sessions.iter() {
        match session.status().await.phase {
            SessionPhase::Idle => stale.push(id.clone()),
            _ => {
                return Err(AppError::Conflict(
                    "an interview is already in progress".to_string(),
                ));
            }
        }
    }
    for id in stale {
        sessions.remove(&id);
    }

    let config = SessionConfig {
        model: state.config.live.model.clone(),
        voice: state.config.live.voice.clone(),
        input_sample_rate: state.config.audio.input_sample_rate,
        output_sample_rate: state.config.audio.output_sample_rate,
        frame_samples: state.config.audio.frame_samples,
        ..SessionConfig::new(req.job_title)
    };

    let session = Arc::new(
        InterviewSession::start(config, state.devices.as_ref(), state.connector.as_ref()).await?,
    );
    let interview_id = session.id().to_string();
    let status = session.status().await;
    sessions.insert(interview_id.clone(), session);

    info!("Interview started: {}", interview_id);

    Ok(Json(StartInterviewResponse {
        interview_id,
        status,
    }))
}

/// POST /api/interview/:interview_id/end
/// End an interview session; safe to call on one that already ended
pub async fn end_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> Result<Json<EndInterviewResponse>, AppError> {
    info!("Ending interview: {}", interview_id);

    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&interview_id).cloned()
    };
    let session = session
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;

    // The session stays in the map so its final status remains pollable.
    session.end().await;
    let status = session.status().await;

    Ok(Json(EndInterviewResponse {
        interview_id,
        status,
    }))
}

/// GET /api/interview/:interview_id/status
/// Snapshot of a session's progress
pub async fn get_interview_status(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> Result<Json<InterviewStatus>, AppError> {
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&interview_id).cloned()
    };
    let session = session
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;

    Ok(Json(session.status().await))
}

// ============================================================================
// Resume Handlers
// ============================================================================

/// POST /api/gemini/analyze
/// Analyze an uploaded resume (multipart field "resume")
pub async fn analyze_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResumeAnalysis>, AppError> {
    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart request: {e}")))?
    {
        if field.name() != Some("resume") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("resume").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
        document = Some(UploadedDocument {
            file_name,
            mime_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let document =
        document.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
    if document.bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let analysis = state.analyzer.analyze(&document).await?;
    Ok(Json(analysis))
}

/// GET /api/resume
/// The caller's stored resume, or null if they have none
pub async fn get_resume(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Option<StoredResume>>, AppError> {
    let resume = state.store.get(&user.id).await?;
    Ok(Json(resume))
}

/// POST /api/resume
/// Create or replace the caller's resume
pub async fn save_resume(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SaveResumeRequest>,
) -> Result<Json<StoredResume>, AppError> {
    let content = req
        .content
        .ok_or_else(|| AppError::Validation("Resume content is required".to_string()))?;
    let resume = state.store.upsert(&user.id, content).await?;
    Ok(Json(resume))
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
