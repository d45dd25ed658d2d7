use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recording control
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/dismiss", post(handlers::dismiss_error))
        .route("/recording/new", post(handlers::new_recording))
        // Observation
        .route("/recording/status", get(handlers::get_status))
        .route("/recording/events", get(handlers::status_events))
        .route("/recording/result", get(handlers::get_result))
        .route("/recording/audio", get(handlers::export_audio))
        // Environment queries
        .route("/devices", get(handlers::list_devices))
        .route("/meeting/info", get(handlers::meeting_info))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
