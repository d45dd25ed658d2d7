use chrono::{DateTime, Utc};
use serde::Serialize;

/// The single global recording lifecycle state.
///
/// Mutated only by the recording surface coordinator; every other context is
/// a read-only observer. The guards here are the sole mutual-exclusion
/// mechanism for the one-session-process-wide rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleStatus {
    Idle,
    Starting,
    Recording { started_at: DateTime<Utc> },
    Stopping,
    Processing,
    Results { transcript: String, summary: String },
    Error { message: String },
}

impl LifecycleStatus {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleStatus::Idle => "idle",
            LifecycleStatus::Starting => "starting",
            LifecycleStatus::Recording { .. } => "recording",
            LifecycleStatus::Stopping => "stopping",
            LifecycleStatus::Processing => "processing",
            LifecycleStatus::Results { .. } => "results",
            LifecycleStatus::Error { .. } => "error",
        }
    }

    /// `start` is only legal while Idle; anything else is AlreadyActive.
    pub fn can_start(&self) -> bool {
        matches!(self, LifecycleStatus::Idle)
    }

    /// `stop` acts only while Recording; everywhere else it is a no-op so a
    /// second stop can never double-finalize.
    pub fn stop_is_noop(&self) -> bool {
        !matches!(self, LifecycleStatus::Recording { .. })
    }

    pub fn can_dismiss(&self) -> bool {
        matches!(self, LifecycleStatus::Error { .. })
    }

    pub fn can_reset(&self) -> bool {
        matches!(self, LifecycleStatus::Results { .. })
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            LifecycleStatus::Recording { started_at } => Some(*started_at),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_states() -> Vec<LifecycleStatus> {
        vec![
            LifecycleStatus::Idle,
            LifecycleStatus::Starting,
            LifecycleStatus::Recording {
                started_at: Utc::now(),
            },
            LifecycleStatus::Stopping,
            LifecycleStatus::Processing,
            LifecycleStatus::Results {
                transcript: "t".into(),
                summary: "s".into(),
            },
            LifecycleStatus::Error {
                message: "m".into(),
            },
        ]
    }

    #[test]
    fn test_start_only_from_idle() {
        for state in all_states() {
            assert_eq!(state.can_start(), state == LifecycleStatus::Idle);
        }
    }

    #[test]
    fn test_stop_acts_only_while_recording() {
        for state in all_states() {
            assert_eq!(state.stop_is_noop(), state.name() != "recording");
        }
    }

    #[test]
    fn test_dismiss_and_reset_guards() {
        for state in all_states() {
            assert_eq!(state.can_dismiss(), state.name() == "error");
            assert_eq!(state.can_reset(), state.name() == "results");
        }
    }

    #[test]
    fn test_serializes_with_state_tag() {
        let json = serde_json::to_value(LifecycleStatus::Idle).unwrap();
        assert_eq!(json["state"], "idle");

        let json = serde_json::to_value(LifecycleStatus::Error {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["message"], "boom");
    }
}
