/// Node status definitions for tracking crawl progress
///
/// A node only ever moves forward through `Pending -> InProgress -> Done`.
/// The reconciliation sweep is the one place allowed to send a stale
/// `InProgress` node back to `Pending`.
use std::fmt;

/// Represents the current lifecycle status of a node in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeStatus {
    /// Discovered (or seeded) and waiting in the frontier
    Pending,

    /// Claimed by a worker; its friends list is being walked
    InProgress,

    /// All neighbors have been discovered and enqueued
    Done,
}

impl NodeStatus {
    /// Returns true if the node is part of the frontier
    pub fn is_frontier(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if no further processing will happen for this node
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` respects the forward-only lifecycle
    ///
    /// Staying in the same status counts as valid so that status updates are idempotent.
    pub fn can_transition_to(&self, next: NodeStatus) -> bool {
        *self <= next
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    /// Returns all statuses in lifecycle order
    pub fn all_statuses() -> [Self; 3] {
        [Self::Pending, Self::InProgress, Self::Done]
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
