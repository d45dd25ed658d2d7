use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Json},
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info};

use super::state::AppState;
use crate::error::{BrokerError, RecorderError};
use crate::meeting;
use crate::platform::{MicSelector, TabId};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartRecordingRequest {
    /// Tab to capture
    pub tab_id: TabId,

    /// Optional microphone device id (default device when omitted)
    pub mic_device: Option<String>,

    /// Optional caller label, prefixed onto exported file names
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub status: String,
    pub finalized: bool,
    pub blob_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct ExportAudioResponse {
    pub file: String,
    pub bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct MeetingInfoQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(e: &RecorderError) -> (StatusCode, Json<ErrorResponse>) {
    let code = match e {
        RecorderError::AlreadyActive | RecorderError::InvalidState { .. } => StatusCode::CONFLICT,
        RecorderError::SurfaceGone => StatusCode::SERVICE_UNAVAILABLE,
        RecorderError::Broker(BrokerError::CapabilityUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
        RecorderError::Broker(_) | RecorderError::Capture(_) => StatusCode::BAD_REQUEST,
        RecorderError::NoResult => StatusCode::NOT_FOUND,
        RecorderError::Stop(_) | RecorderError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        code,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /recording/start
pub async fn start_recording(
    State(state): State<AppState>,
    Json(req): Json<StartRecordingRequest>,
) -> impl IntoResponse {
    info!("Start requested for tab {}", req.tab_id);

    let mic = match req.mic_device {
        Some(id) => MicSelector::Device(id),
        None => MicSelector::Default,
    };

    match state.surface.start(req.tab_id, mic, req.label).await {
        Ok(started) => (
            StatusCode::OK,
            Json(StartRecordingResponse {
                session_id: started.session_id,
                started_at: started.started_at,
                status: "recording".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            error_response(&e).into_response()
        }
    }
}

/// POST /recording/stop
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.surface.stop().await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(StopRecordingResponse {
                status: if outcome.finalized { "stopped" } else { "idle" }.to_string(),
                finalized: outcome.finalized,
                blob_bytes: outcome.blob_bytes,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            error_response(&e).into_response()
        }
    }
}

/// GET /recording/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.surface.status().await)
}

/// POST /recording/dismiss
pub async fn dismiss_error(State(state): State<AppState>) -> impl IntoResponse {
    match state.surface.dismiss().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "idle" }))).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /recording/new
pub async fn new_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.surface.new_recording().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "idle" }))).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /recording/result
pub async fn get_result(State(state): State<AppState>) -> impl IntoResponse {
    match state.surface.result().await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /recording/audio
/// Export the stored recording to the downloads directory.
pub async fn export_audio(State(state): State<AppState>) -> impl IntoResponse {
    let blob = match state.sink.load_blob() {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "no recording found; record a meeting first".to_string(),
                }),
            )
                .into_response();
        }
        Err(e) => {
            error!("Failed to load stored recording: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.sink.export_file(&blob, None) {
        Ok(path) => (
            StatusCode::OK,
            Json(ExportAudioResponse {
                file: path.display().to_string(),
                bytes: blob.data.len(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to export recording: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /recording/events
/// Server-sent stream of status broadcasts. Best-effort: a lagging observer
/// skips missed updates rather than receiving a backlog.
pub async fn status_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.surface.subscribe();

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(snapshot) => match Event::default().json_data(&snapshot) {
                    Ok(event) => return Some((Ok(event), rx)),
                    Err(_) => continue,
                },
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /devices
pub async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.platform.enumerate_devices().await)
}

/// GET /meeting/info?url=...
pub async fn meeting_info(Query(query): Query<MeetingInfoQuery>) -> impl IntoResponse {
    Json(meeting::meeting_info(&query.url))
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
