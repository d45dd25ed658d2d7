//! Host platform capability surface.
//!
//! Everything the host environment provides — capture token minting, tab and
//! microphone stream acquisition, device enumeration, local monitor playback —
//! sits behind the `CapturePlatform` trait. The shipped implementation is a
//! deterministic simulated platform; a real host binding plugs in at the same
//! seam.

pub mod simulated;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::audio::AudioFrame;
use crate::error::{BrokerError, CaptureError};

pub use simulated::{SimulatedConfig, SimulatedPlatform};

/// Host-assigned tab identifier.
pub type TabId = u32;

/// One-time credential authorizing audio capture of a specific tab.
///
/// Valid for at most one consumption; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureToken(String);

impl CaptureToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Microphone device selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MicSelector {
    /// The host's default input device
    #[default]
    Default,
    /// A specific device by identifier
    Device(String),
}

/// Constraints applied when opening a microphone stream.
#[derive(Debug, Clone)]
pub struct MicConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for MicConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// An enumerated input device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
}

/// Idempotent stop signal for a device stream.
///
/// The producing task checks the flag between frames and winds down once it
/// is set; the frame channel closing is the consumer's end-of-stream signal.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    stopped: Arc<AtomicBool>,
}

impl StreamHandle {
    pub fn new() -> Self {
        Self {
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Default for StreamHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A live capture stream: delivered frames plus its stop handle.
#[derive(Debug)]
pub struct CaptureStream {
    pub frames: mpsc::Receiver<AudioFrame>,
    pub handle: StreamHandle,
}

/// Handle for local loopback playback of the tab stream, so the user keeps
/// hearing the audio being recorded.
#[derive(Debug)]
pub struct MonitorHandle {
    tab: TabId,
    active: AtomicBool,
}

impl MonitorHandle {
    pub fn new(tab: TabId) -> Self {
        debug!("Monitoring tab {} audio on local output", tab);
        Self {
            tab,
            active: AtomicBool::new(true),
        }
    }

    pub fn stop(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            debug!("Stopped monitoring tab {} audio", self.tab);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// The host platform's capture capability surface.
#[async_trait::async_trait]
pub trait CapturePlatform: Send + Sync {
    /// Whether the tab-capture capability is present and enabled.
    fn capture_capability_available(&self) -> bool;

    /// Mint a one-time capture token for the given tab.
    async fn mint_capture_token(&self, tab: TabId) -> Result<CaptureToken, BrokerError>;

    /// Consume a token and open the tab audio stream. Single attempt:
    /// tokens are single-use, there is no retry.
    async fn open_tab_stream(&self, token: &CaptureToken) -> Result<CaptureStream, CaptureError>;

    /// Open a microphone stream matching the selector.
    async fn open_mic_stream(
        &self,
        selector: &MicSelector,
        constraints: &MicConstraints,
    ) -> Result<CaptureStream, CaptureError>;

    /// Enumerate available input devices.
    async fn enumerate_devices(&self) -> Vec<DeviceInfo>;

    /// Route the tab stream to the local output device.
    fn start_monitor(&self, tab: TabId) -> MonitorHandle;
}
