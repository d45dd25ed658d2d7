//! Error taxonomy for the capture pipeline.
//!
//! Token minting, stream acquisition, finalization and persistence each fail
//! in user-actionable ways, so they carry their own error enums. Microphone
//! failures are deliberately absent from the start path: they degrade the
//! recording to tab-only audio and are logged, not raised.

use thiserror::Error;

use crate::platform::TabId;

/// Failures while exchanging a tab id for a capture token.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("tab capture capability is not available; re-enable capture access and restart the service")]
    CapabilityUnavailable,

    #[error("tab {0} has no audio track")]
    NoAudioInTarget(TabId),

    /// The host platform rejected the mint request; carries the host's text.
    #[error("capture request denied by host: {0}")]
    HostDenied(String),
}

/// Failures while acquiring streams or starting the encoder.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot capture tab audio: {0}; refresh the tab and try again")]
    TabAudioUnavailable(String),

    /// Non-fatal on the start path; recording continues with tab audio only.
    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    #[error("failed to initialize chunked encoder: {0}")]
    EncoderInitFailed(String),
}

/// Failures while stopping and persisting a recording.
#[derive(Debug, Error)]
pub enum StopError {
    /// Surfaced distinctly so the user knows to re-record rather than retry.
    #[error("recording finalized with zero bytes of audio; record again rather than retrying")]
    EmptyRecording,

    #[error("failed to finalize recording: {0}")]
    Finalize(String),

    /// Device cleanup has already run when this is reported.
    #[error("failed to persist recording: {0}")]
    SinkWriteFailed(String),
}

/// Result Sink failures (key-value store and file export).
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store entry is malformed: {0}")]
    Malformed(String),
}

/// Top-level error for recording surface operations.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("a recording is already active")]
    AlreadyActive,

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("recording surface is not running")]
    SurfaceGone,

    #[error("no completed recording available")]
    NoResult,

    #[error("processing failed: {0}")]
    Processing(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Stop(#[from] StopError),
}
