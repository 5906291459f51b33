//! Task status.

use serde::{Deserialize, Serialize};

use super::machine::Trigger;

/// Lifecycle status of a dispatched task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Created, not yet sent to the employee.
    Draft,
    /// Sent over WhatsApp.
    Sent,
    /// Delivery/read receipt arrived.
    Read,
    /// Employee accepted.
    Accepted,
    /// Employee is working on it.
    InProgress,
    /// Employee reported completion; awaiting manager review.
    Review,
    /// Manager approved the result.
    Completed,
    /// Employee declined.
    Rejected,
    /// Deadline passed before completion. Not a dead end.
    Overdue,
    /// Cancelled by a manager.
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 10] = [
        Self::Draft,
        Self::Sent,
        Self::Read,
        Self::Accepted,
        Self::InProgress,
        Self::Review,
        Self::Completed,
        Self::Rejected,
        Self::Overdue,
        Self::Cancelled,
    ];

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    /// Check if the task is still live (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Check if some trigger moves this status to `target`.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        Trigger::ALL
            .iter()
            .any(|trigger| trigger.target(*self) == Some(target))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Sent => "SENT",
            Self::Read => "READ",
            Self::Accepted => "ACCEPTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Review => "REVIEW",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
            Self::Overdue => "OVERDUE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("unknown task status: {s}"))
    }
}
