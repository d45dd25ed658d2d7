//! Status/notification channel.
//!
//! One-directional broadcast from the recording surface to any listening
//! observer. Delivery is best-effort: with no observer subscribed the update
//! is dropped, never queued or retried. Observers therefore query current
//! status on their own startup and only then follow the broadcast.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::session::LifecycleStatus;

/// A point-in-time view of the lifecycle state, as observers see it.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub status: LifecycleStatus,
    /// `HH:MM:SS` since recording start, present while Recording
    pub elapsed: Option<String>,
    /// True when the owning surface is gone and any in-flight recording with
    /// it; the status then resolves to Idle, never a stale Recording
    pub data_loss: bool,
    pub warning: Option<String>,
}

impl StatusSnapshot {
    pub fn of(status: &LifecycleStatus) -> Self {
        let elapsed = status
            .started_at()
            .map(|t| format_elapsed(Utc::now().signed_duration_since(t)));
        Self {
            status: status.clone(),
            elapsed,
            data_loss: false,
            warning: None,
        }
    }

    /// The snapshot reported when the owning surface no longer exists.
    pub fn lost() -> Self {
        Self {
            status: LifecycleStatus::Idle,
            elapsed: None,
            data_loss: true,
            warning: Some(
                "recording surface is gone; any in-flight recording was lost".to_string(),
            ),
        }
    }
}

/// Best-effort broadcast of status snapshots.
#[derive(Clone)]
pub struct StatusChannel {
    tx: broadcast::Sender<StatusSnapshot>,
}

impl StatusChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a snapshot. With no subscriber the update is dropped.
    pub fn publish(&self, snapshot: StatusSnapshot) {
        if self.tx.send(snapshot).is_err() {
            debug!("No status observers; update dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new(16)
    }
}

/// Zero-padded `HH:MM:SS` for the elapsed-time display.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Elapsed display between a start instant and now.
pub fn elapsed_since(started_at: DateTime<Utc>) -> String {
    format_elapsed(Utc::now().signed_duration_since(started_at))
}
