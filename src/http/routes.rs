use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Uploads larger than this are rejected before they reach a handler.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Interview control
        .route("/api/interview/start", post(handlers::start_interview))
        .route(
            "/api/interview/:interview_id/end",
            post(handlers::end_interview),
        )
        .route(
            "/api/interview/:interview_id/status",
            get(handlers::get_interview_status),
        )
        // Resume analysis and persistence
        .route("/api/gemini/analyze", post(handlers::analyze_resume))
        .route(
            "/api/resume",
            get(handlers::get_resume).post(handlers::save_resume),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        // Request logging and permissive CORS for the local frontend
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
