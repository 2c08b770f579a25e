//! Queued offline actions and replay results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::CreateSessionInput;

/// A mutation deferred until the device is back online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ActionKind {
    CreateSession(CreateSessionInput),
    JoinSession { session_id: String },
    LeaveSession { session_id: String },
    CancelSession { session_id: String },
}

impl ActionKind {
    /// Short description for logs and the summary toast.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateSession(input) => {
                format!("create {} session", input.prayer_type.display_name())
            }
            Self::JoinSession { session_id } => format!("join session {session_id}"),
            Self::LeaveSession { session_id } => format!("leave session {session_id}"),
            Self::CancelSession { session_id } => format!("cancel session {session_id}"),
        }
    }
}

/// A queued action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineAction {
    /// Random id, unique within the queue.
    pub id: String,
    pub queued_at: DateTime<Utc>,
    pub kind: ActionKind,
}

/// What happened to one action during a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action_id: String,
    pub description: String,
    /// `None` when applied, the error message otherwise.
    pub error: Option<String>,
}

impl ActionOutcome {
    /// Whether the action was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of one pass over the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub applied: usize,
    pub failed: usize,
    /// Per-action outcomes in replay order.
    pub outcomes: Vec<ActionOutcome>,
}

impl QueueSummary {
    /// Total actions replayed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.applied + self.failed
    }

    /// Text for the summary toast.
    #[must_use]
    pub fn message(&self) -> String {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match (self.applied, self.failed) {
            (0, 0) => "Nothing to sync".to_string(),
            (applied, 0) => format!("Synced {applied} offline action{}", plural(applied)),
            (0, failed) => format!("{failed} offline action{} failed", plural(failed)),
            (applied, failed) => format!(
                "Synced {applied} offline action{}, {failed} failed",
                plural(applied)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_serialize_as_tagged_records() {
        let action = OfflineAction {
            id: "a1".to_string(),
            queued_at: "2025-03-07T18:00:00Z".parse().unwrap(),
            kind: ActionKind::JoinSession {
                session_id: "s1".to_string(),
            },
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"]["type"], "join_session");
        assert_eq!(json["kind"]["payload"]["session_id"], "s1");

        let back: OfflineAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn summary_messages() {
        let summary = |applied, failed| QueueSummary {
            applied,
            failed,
            outcomes: Vec::new(),
        };
        assert_eq!(summary(3, 0).message(), "Synced 3 offline actions");
        assert_eq!(summary(1, 0).message(), "Synced 1 offline action");
        assert_eq!(summary(2, 1).message(), "Synced 2 offline actions, 1 failed");
        assert_eq!(summary(0, 2).message(), "2 offline actions failed");
        assert_eq!(summary(0, 0).message(), "Nothing to sync");
    }
}
