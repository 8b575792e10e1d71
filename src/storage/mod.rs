//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Node status persistence (the durable frontier)
//! - Atomic claiming and conditional insertion for concurrent workers
//! - Run tracking for the audit trail

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{NodeStore, StorageError, StorageResult};

use crate::identity::NodeId;
use crate::state::{FlagStatus, NodeStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

/// Opens (creating if needed) the node store at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a node in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub status: NodeStatus,
    /// `None` when the display name lookup failed at discovery time
    pub display_name: Option<String>,
    pub flag_status: FlagStatus,
    pub origin_worker: String,
    pub discovered_at: String,
    pub updated_at: String,
}

/// A node about to be inserted; it always enters the store as pending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub id: NodeId,
    pub display_name: Option<String>,
    pub flag_status: FlagStatus,
    pub origin_worker: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub worker_id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Formats a timestamp the way it is stored
///
/// Fixed millisecond precision keeps stored timestamps comparable as strings.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
