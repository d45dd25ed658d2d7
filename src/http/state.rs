use std::sync::Arc;

use crate::platform::CapturePlatform;
use crate::sink::ResultSink;
use crate::surface::SurfaceHandle;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Command channel to the recording surface coordinator
    pub surface: SurfaceHandle,
    /// Result sink for audio export
    pub sink: Arc<ResultSink>,
    /// Host platform, for device enumeration
    pub platform: Arc<dyn CapturePlatform>,
}

impl AppState {
    pub fn new(
        surface: SurfaceHandle,
        sink: Arc<ResultSink>,
        platform: Arc<dyn CapturePlatform>,
    ) -> Self {
        Self {
            surface,
            sink,
            platform,
        }
    }
}
