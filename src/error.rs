use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::resume::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Microphone or speaker could not be acquired.
    #[error("device access: {0}")]
    DeviceAccess(String),

    /// The live connection failed to open or died mid-session.
    #[error("transport: {0}")]
    Transport(String),

    /// Upstream analysis call failed.
    #[error("analysis: {0}")]
    Analysis(String),

    /// Resume store I/O failure.
    #[error("storage: {0}")]
    Persistence(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::DeviceAccess(msg) => {
                tracing::error!("device access error: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::Transport(msg) => {
                tracing::error!("transport error: {msg}");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Analysis(msg) => {
                tracing::error!("analysis error: {msg}");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Persistence(msg) => {
                tracing::error!("storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({ "message": message }));

        (status, body).into_response()
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::UnsupportedType(t) => {
                AppError::Validation(format!("Unsupported file type: {t}"))
            }
            other => AppError::Analysis(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Persistence(err.to_string())
    }
}
