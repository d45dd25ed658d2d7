//! Simulated host platform.
//!
//! Produces deterministic synthetic audio streams on a fixed frame interval
//! and enforces the host's capture rules: capability can be disabled, tokens
//! are single-use, tabs can lack audio, be captured elsewhere, or close while
//! a stream is live. Failure injection hooks drive the integration tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{
    CapturePlatform, CaptureStream, CaptureToken, DeviceInfo, MicConstraints, MicSelector,
    MonitorHandle, StreamHandle, TabId,
};
use crate::audio::{AudioFrame, StreamSource};
use crate::error::{BrokerError, CaptureError};

/// Parameters for the synthetic streams.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interval between produced frames in milliseconds
    pub frame_interval_ms: u64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_interval_ms: 100,
        }
    }
}

#[derive(Debug)]
struct TabEntry {
    has_audio: bool,
    closed: bool,
    captured_elsewhere: bool,
    /// Stop handle for a live stream of this tab, so closing the tab ends it
    active_stream: Option<StreamHandle>,
}

#[derive(Debug, Default)]
struct PlatformState {
    capability_enabled: bool,
    deny_reason: Option<String>,
    tabs: HashMap<TabId, TabEntry>,
    /// Outstanding single-use tokens
    tokens: HashMap<String, TabId>,
    devices: Vec<DeviceInfo>,
    mic_failure: Option<String>,
}

pub struct SimulatedPlatform {
    config: SimulatedConfig,
    state: Mutex<PlatformState>,
}

impl SimulatedPlatform {
    pub fn new(config: SimulatedConfig) -> Self {
        info!(
            "Simulated capture platform: {}Hz, {} channels, {}ms frames",
            config.sample_rate, config.channels, config.frame_interval_ms
        );

        let state = PlatformState {
            capability_enabled: true,
            devices: vec![DeviceInfo {
                id: "default".to_string(),
                label: "Built-in Microphone".to_string(),
            }],
            ..Default::default()
        };

        Self {
            config,
            state: Mutex::new(state),
        }
    }

    pub fn register_tab(&self, tab: TabId, has_audio: bool) {
        let mut state = self.lock();
        state.tabs.insert(
            tab,
            TabEntry {
                has_audio,
                closed: false,
                captured_elsewhere: false,
                active_stream: None,
            },
        );
    }

    /// Close a tab; any live stream of it ends.
    pub fn close_tab(&self, tab: TabId) {
        let mut state = self.lock();
        if let Some(entry) = state.tabs.get_mut(&tab) {
            entry.closed = true;
            if let Some(handle) = entry.active_stream.take() {
                warn!("Tab {} closed while being captured", tab);
                handle.stop();
            }
        }
    }

    pub fn set_capability_enabled(&self, enabled: bool) {
        self.lock().capability_enabled = enabled;
    }

    /// The next mint request fails with the given host error text.
    pub fn deny_next_mint(&self, reason: impl Into<String>) {
        self.lock().deny_reason = Some(reason.into());
    }

    pub fn mark_captured_elsewhere(&self, tab: TabId) {
        if let Some(entry) = self.lock().tabs.get_mut(&tab) {
            entry.captured_elsewhere = true;
        }
    }

    pub fn add_device(&self, id: impl Into<String>, label: impl Into<String>) {
        self.lock().devices.push(DeviceInfo {
            id: id.into(),
            label: label.into(),
        });
    }

    /// Every microphone acquisition fails with the given reason.
    pub fn fail_microphone(&self, reason: impl Into<String>) {
        self.lock().mic_failure = Some(reason.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlatformState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Spawn a task producing deterministic frames until stopped.
    fn spawn_stream(&self, source: StreamSource, seed: u64) -> CaptureStream {
        let handle = StreamHandle::new();
        let (tx, rx) = mpsc::channel(64);

        let task_handle = handle.clone();
        let config = self.config.clone();
        let samples_per_frame =
            (config.sample_rate as u64 * config.channels as u64 * config.frame_interval_ms / 1000)
                as usize;

        tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            loop {
                tokio::time::sleep(Duration::from_millis(config.frame_interval_ms)).await;
                if task_handle.is_stopped() {
                    break;
                }

                let samples: Vec<i16> = (0..samples_per_frame)
                    .map(|i| ((seed + timestamp_ms + i as u64) % 2000) as i16 - 1000)
                    .collect();

                let frame = AudioFrame {
                    samples,
                    sample_rate: config.sample_rate,
                    channels: config.channels,
                    timestamp_ms,
                    source,
                };

                if tx.send(frame).await.is_err() {
                    break;
                }
                timestamp_ms += config.frame_interval_ms;
            }
        });

        CaptureStream { frames: rx, handle }
    }
}

#[async_trait::async_trait]
impl CapturePlatform for SimulatedPlatform {
    fn capture_capability_available(&self) -> bool {
        self.lock().capability_enabled
    }

    async fn mint_capture_token(&self, tab: TabId) -> Result<CaptureToken, BrokerError> {
        let mut state = self.lock();

        if !state.capability_enabled {
            return Err(BrokerError::CapabilityUnavailable);
        }

        if let Some(reason) = state.deny_reason.take() {
            return Err(BrokerError::HostDenied(reason));
        }

        let entry = state
            .tabs
            .get(&tab)
            .ok_or_else(|| BrokerError::HostDenied(format!("no tab with id {tab}")))?;

        if entry.closed {
            return Err(BrokerError::HostDenied(format!("tab {tab} is closed")));
        }
        if !entry.has_audio {
            return Err(BrokerError::NoAudioInTarget(tab));
        }

        // Tokens are host-defined and not deduplicated: minting twice for the
        // same tab yields two distinct tokens.
        let token = format!("cap-{}-{}", tab, uuid::Uuid::new_v4());
        state.tokens.insert(token.clone(), tab);

        Ok(CaptureToken::new(token))
    }

    async fn open_tab_stream(&self, token: &CaptureToken) -> Result<CaptureStream, CaptureError> {
        let tab = {
            let mut state = self.lock();

            let tab = state.tokens.remove(token.as_str()).ok_or_else(|| {
                CaptureError::TabAudioUnavailable(
                    "capture token is invalid or already consumed".to_string(),
                )
            })?;

            let entry = state.tabs.get(&tab).ok_or_else(|| {
                CaptureError::TabAudioUnavailable(format!("tab {tab} no longer exists"))
            })?;

            if entry.closed {
                return Err(CaptureError::TabAudioUnavailable(format!(
                    "tab {tab} is closed"
                )));
            }
            if entry.captured_elsewhere {
                return Err(CaptureError::TabAudioUnavailable(format!(
                    "tab {tab} is already captured by another consumer"
                )));
            }

            tab
        };

        let stream = self.spawn_stream(StreamSource::Tab, tab as u64 * 17);

        if let Some(entry) = self.lock().tabs.get_mut(&tab) {
            entry.active_stream = Some(stream.handle.clone());
        }

        Ok(stream)
    }

    async fn open_mic_stream(
        &self,
        selector: &MicSelector,
        constraints: &MicConstraints,
    ) -> Result<CaptureStream, CaptureError> {
        let seed = {
            let state = self.lock();

            if let Some(reason) = &state.mic_failure {
                return Err(CaptureError::MicrophoneUnavailable(reason.clone()));
            }

            match selector {
                MicSelector::Default => 7,
                MicSelector::Device(id) => {
                    let known = state.devices.iter().any(|d| &d.id == id);
                    if !known {
                        return Err(CaptureError::MicrophoneUnavailable(format!(
                            "no input device with id {id}"
                        )));
                    }
                    1000 + id.len() as u64
                }
            }
        };

        info!(
            "Opening microphone stream ({:?}, ec={} ns={} agc={})",
            selector,
            constraints.echo_cancellation,
            constraints.noise_suppression,
            constraints.auto_gain_control
        );

        Ok(self.spawn_stream(StreamSource::Microphone, seed))
    }

    async fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        self.lock().devices.clone()
    }

    fn start_monitor(&self, tab: TabId) -> MonitorHandle {
        MonitorHandle::new(tab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_is_single_use() {
        let platform = SimulatedPlatform::new(SimulatedConfig::default());
        platform.register_tab(1, true);

        let token = platform.mint_capture_token(1).await.unwrap();
        let first = platform.open_tab_stream(&token).await;
        assert!(first.is_ok());

        let second = platform.open_tab_stream(&token).await;
        assert!(matches!(
            second,
            Err(CaptureError::TabAudioUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_no_audio_tab_rejected_at_mint() {
        let platform = SimulatedPlatform::new(SimulatedConfig::default());
        platform.register_tab(2, false);

        assert!(matches!(
            platform.mint_capture_token(2).await,
            Err(BrokerError::NoAudioInTarget(2))
        ));
    }

    #[tokio::test]
    async fn test_two_mints_yield_distinct_tokens() {
        let platform = SimulatedPlatform::new(SimulatedConfig::default());
        platform.register_tab(3, true);

        let a = platform.mint_capture_token(3).await.unwrap();
        let b = platform.mint_capture_token(3).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_captured_elsewhere_fails_acquisition() {
        let platform = SimulatedPlatform::new(SimulatedConfig::default());
        platform.register_tab(4, true);
        platform.mark_captured_elsewhere(4);

        let token = platform.mint_capture_token(4).await.unwrap();
        let err = platform.open_tab_stream(&token).await.unwrap_err();
        assert!(err.to_string().contains("already captured"));
    }

    #[tokio::test]
    async fn test_stream_produces_frames_until_stopped() {
        let platform = SimulatedPlatform::new(SimulatedConfig {
            sample_rate: 8000,
            channels: 1,
            frame_interval_ms: 5,
        });
        platform.register_tab(5, true);

        let token = platform.mint_capture_token(5).await.unwrap();
        let mut stream = platform.open_tab_stream(&token).await.unwrap();

        let frame = stream.frames.recv().await.expect("frame produced");
        assert_eq!(frame.sample_rate, 8000);
        assert_eq!(frame.source, StreamSource::Tab);
        assert_eq!(frame.samples.len(), 40); // 5ms at 8kHz mono

        stream.handle.stop();
        // Channel closes once the producer observes the stop flag.
        while stream.frames.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_unknown_mic_device_fails() {
        let platform = SimulatedPlatform::new(SimulatedConfig::default());

        let err = platform
            .open_mic_stream(
                &MicSelector::Device("usb-7".to_string()),
                &MicConstraints::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::MicrophoneUnavailable(_)));
    }
}
