//! Capture Token Broker.
//!
//! Runs in the coordinating context, which has no device access of its own:
//! its only job is exchanging a tab id for a one-time capture token from the
//! host platform. The sole mutable state is a flag recording that a durable
//! recording surface has been provisioned, so provisioning is not repeated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::error::BrokerError;
use crate::platform::{CapturePlatform, CaptureToken, TabId};

pub struct CaptureBroker {
    platform: Arc<dyn CapturePlatform>,
    surface_provisioned: AtomicBool,
}

impl CaptureBroker {
    pub fn new(platform: Arc<dyn CapturePlatform>) -> Self {
        Self {
            platform,
            surface_provisioned: AtomicBool::new(false),
        }
    }

    /// Exchange a tab id for a one-time capture token.
    ///
    /// Concurrent requests for the same tab are not deduplicated; the host
    /// may return distinct tokens. A single active session is assumed
    /// process-wide, enforced elsewhere by the lifecycle guard.
    pub async fn request_token(&self, tab: TabId) -> Result<CaptureToken, BrokerError> {
        if !self.platform.capture_capability_available() {
            return Err(BrokerError::CapabilityUnavailable);
        }

        let token = self.platform.mint_capture_token(tab).await?;
        info!("Minted capture token for tab {}", tab);
        Ok(token)
    }

    /// Record that a durable recording surface exists. Returns whether one
    /// was already provisioned, so the caller can skip redundant setup.
    pub fn mark_surface_provisioned(&self) -> bool {
        self.surface_provisioned.swap(true, Ordering::SeqCst)
    }

    pub fn surface_provisioned(&self) -> bool {
        self.surface_provisioned.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{SimulatedConfig, SimulatedPlatform};

    fn broker_with(platform: SimulatedPlatform) -> (CaptureBroker, Arc<SimulatedPlatform>) {
        let platform = Arc::new(platform);
        let broker = CaptureBroker::new(platform.clone());
        (broker, platform)
    }

    #[tokio::test]
    async fn test_capability_unavailable() {
        let (broker, platform) = broker_with(SimulatedPlatform::new(SimulatedConfig::default()));
        platform.register_tab(1, true);
        platform.set_capability_enabled(false);

        assert!(matches!(
            broker.request_token(1).await,
            Err(BrokerError::CapabilityUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_host_denied_propagates_host_text() {
        let (broker, platform) = broker_with(SimulatedPlatform::new(SimulatedConfig::default()));
        platform.register_tab(1, true);
        platform.deny_next_mint("user gesture required");

        let err = broker.request_token(1).await.unwrap_err();
        assert!(err.to_string().contains("user gesture required"));
    }

    #[tokio::test]
    async fn test_provisioning_flag_flips_once() {
        let (broker, _platform) = broker_with(SimulatedPlatform::new(SimulatedConfig::default()));

        assert!(!broker.surface_provisioned());
        assert!(!broker.mark_surface_provisioned());
        assert!(broker.mark_surface_provisioned());
        assert!(broker.surface_provisioned());
    }
}
