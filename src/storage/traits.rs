//! Storage traits and error types
//!
//! This module defines the trait interface for node store backends and
//! associated error types.

use crate::identity::NodeId;
use crate::state::{FlagStatus, NodeStatus};
use crate::storage::{NewNode, NodeRecord, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to connect to store: {0}")]
    Connection(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable node table consumed by the crawl orchestrator
///
/// The table doubles as the work queue (nodes in `pending`) and the audit trail
/// (nothing is ever deleted). Status updates never move a node backwards, with
/// the single exception of [`NodeStore::requeue_stale`].
pub trait NodeStore {
    // ===== Frontier =====

    /// Returns some pending node, or None if the frontier is empty
    ///
    /// Implementations must pick in a consistent order.
    fn get_one_pending(&self) -> StorageResult<Option<NodeId>>;

    /// Atomically moves one pending node to in-progress and returns it
    ///
    /// Two workers calling this concurrently never receive the same node.
    fn claim_pending(&mut self) -> StorageResult<Option<NodeId>>;

    // ===== Status Transitions =====

    /// Moves a pending node to in-progress; a no-op for any other status
    fn mark_in_progress(&mut self, id: &NodeId) -> StorageResult<()>;

    /// Moves a pending or in-progress node to done; a no-op if already done
    fn mark_done(&mut self, id: &NodeId) -> StorageResult<()>;

    /// Returns stale in-progress nodes to the frontier
    ///
    /// Every in-progress node whose last status change is older than `older_than`
    /// goes back to pending. Returns the number of requeued nodes.
    fn requeue_stale(&mut self, older_than: DateTime<Utc>) -> StorageResult<u64>;

    // ===== Node Management =====

    /// Returns true if a node with this id exists, regardless of status
    fn exists(&self, id: &NodeId) -> StorageResult<bool>;

    /// Inserts a pending node unless one with the same id already exists
    ///
    /// Returns true if the node was inserted, false if it was already present.
    fn insert_new(&mut self, node: &NewNode) -> StorageResult<bool>;

    /// Gets a node by id
    fn get_node(&self, id: &NodeId) -> StorageResult<Option<NodeRecord>>;

    // ===== Statistics =====

    /// Counts nodes in a given status
    fn count_by_status(&self, status: NodeStatus) -> StorageResult<u64>;

    /// Counts all nodes
    fn count_total(&self) -> StorageResult<u64>;

    /// Counts nodes per flag status
    fn flag_summary(&self) -> StorageResult<HashMap<FlagStatus, u64>>;

    // ===== Run Management =====

    /// Records the start of a crawl run and returns its id
    fn create_run(&mut self, worker_id: &str, config_hash: &str) -> StorageResult<i64>;

    /// Records the end of a crawl run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
