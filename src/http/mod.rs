//! HTTP API server for the frontend control plane
//!
//! This module provides a REST API over the interview engine and resume
//! services:
//! - POST /api/interview/start - Start a mock interview
//! - POST /api/interview/:id/end - End an interview
//! - GET /api/interview/:id/status - Query session status
//! - POST /api/gemini/analyze - Analyze an uploaded resume
//! - GET /api/resume - Fetch the caller's stored resume
//! - POST /api/resume - Create or replace the caller's resume
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
