pub mod audio;
pub mod broker;
pub mod config;
pub mod error;
pub mod http;
pub mod meeting;
pub mod platform;
pub mod services;
pub mod session;
pub mod sink;
pub mod status;
pub mod surface;

pub use audio::{
    AudioFrame, ChunkedEncoder, EncodedChunk, EncoderConfig, MixerConfig, RecordingBlob,
    StreamMixer, StreamSource,
};
pub use broker::CaptureBroker;
pub use config::{CaptureConfig, Config};
pub use error::{BrokerError, CaptureError, RecorderError, SinkError, StopError};
pub use http::{create_router, AppState};
pub use platform::{
    CapturePlatform, CaptureStream, CaptureToken, DeviceInfo, MicConstraints, MicSelector,
    MonitorHandle, SimulatedConfig, SimulatedPlatform, StreamHandle, TabId,
};
pub use services::{HeuristicSummarizer, PlaceholderTranscriber, Summarizer, Transcriber};
pub use session::{LifecycleStatus, RecordingSession};
pub use sink::{ResultSink, StoredRecording, RECORDING_KEY};
pub use status::{elapsed_since, format_elapsed, StatusChannel, StatusSnapshot};
pub use surface::{
    RecordingResult, RecordingSurface, StartedRecording, StopOutcome, SurfaceHandle,
};
