//! HTTP API server: the interactive surface and observer UI contract.
//!
//! - POST /recording/start - Start recording a tab
//! - POST /recording/stop - Stop and finalize (idempotent)
//! - GET  /recording/status - Query current lifecycle status
//! - POST /recording/dismiss - Dismiss an error
//! - POST /recording/new - Leave the results view
//! - GET  /recording/result - Transcript and summary
//! - GET  /recording/audio - Export the stored recording to a file
//! - GET  /recording/events - SSE stream of status broadcasts
//! - GET  /devices - Enumerate microphone devices
//! - GET  /meeting/info - Detect meeting platform from a URL
//! - GET  /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
