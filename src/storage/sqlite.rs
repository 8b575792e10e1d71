//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the NodeStore trait.

use crate::identity::NodeId;
use crate::state::{FlagStatus, NodeStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{NodeStore, StorageError, StorageResult};
use crate::storage::{format_timestamp, NewNode, NodeRecord, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const NODE_COLUMNS: &str =
    "id, status, display_name, flag_status, origin_worker, discovered_at, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError::Connection)` - Failed to open or initialize the database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StorageError::Connection(format!("{}: {}", path.display(), e)))?;

        // WAL lets several workers share one database file
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        initialize_schema(&conn).map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn now() -> String {
        format_timestamp(Utc::now())
    }

    /// Applies a status change to the row if its current status is one of `from`
    ///
    /// A row in any other status is left untouched.
    fn transition(&mut self, id: &NodeId, from: &[NodeStatus], to: NodeStatus) -> StorageResult<()> {
        let mut changed = 0;
        for current in from {
            changed += self
                .conn
                .execute(
                    "UPDATE nodes SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
                    params![
                        to.to_db_string(),
                        Self::now(),
                        id.as_str(),
                        current.to_db_string()
                    ],
                )
                .map_err(|e| StorageError::Write(format!("{} -> {}: {}", id, to, e)))?;
        }

        if changed == 0 && !self.exists(id)? {
            return Err(StorageError::NodeNotFound(id.to_string()));
        }

        Ok(())
    }
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<NodeRecord> {
    let status: String = row.get(1)?;
    let flag: String = row.get(3)?;
    Ok(NodeRecord {
        id: NodeId::new(row.get::<_, String>(0)?),
        status: NodeStatus::from_db_string(&status).unwrap_or(NodeStatus::Pending),
        display_name: row.get(2)?,
        flag_status: FlagStatus::from_db_string(&flag).unwrap_or(FlagStatus::Unknown),
        origin_worker: row.get(4)?,
        discovered_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        worker_id: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

impl NodeStore for SqliteStorage {
    // ===== Frontier =====

    fn get_one_pending(&self) -> StorageResult<Option<NodeId>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM nodes WHERE status = ?1 ORDER BY rowid ASC LIMIT 1",
                params![NodeStatus::Pending.to_db_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id.map(NodeId::new))
    }

    fn claim_pending(&mut self) -> StorageResult<Option<NodeId>> {
        // Select and update in one statement so concurrent workers never share a node
        let id: Option<String> = self
            .conn
            .query_row(
                "UPDATE nodes SET status = ?1, updated_at = ?2
                 WHERE id = (SELECT id FROM nodes WHERE status = ?3 ORDER BY rowid ASC LIMIT 1)
                   AND status = ?3
                 RETURNING id",
                params![
                    NodeStatus::InProgress.to_db_string(),
                    Self::now(),
                    NodeStatus::Pending.to_db_string()
                ],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id.map(NodeId::new))
    }

    // ===== Status Transitions =====

    fn mark_in_progress(&mut self, id: &NodeId) -> StorageResult<()> {
        self.transition(id, &[NodeStatus::Pending], NodeStatus::InProgress)
    }

    fn mark_done(&mut self, id: &NodeId) -> StorageResult<()> {
        self.transition(
            id,
            &[NodeStatus::Pending, NodeStatus::InProgress],
            NodeStatus::Done,
        )
    }

    fn requeue_stale(&mut self, older_than: DateTime<Utc>) -> StorageResult<u64> {
        let changed = self
            .conn
            .execute(
                "UPDATE nodes SET status = ?1, updated_at = ?2 WHERE status = ?3 AND updated_at < ?4",
                params![
                    NodeStatus::Pending.to_db_string(),
                    Self::now(),
                    NodeStatus::InProgress.to_db_string(),
                    format_timestamp(older_than)
                ],
            )
            .map_err(|e| StorageError::Write(format!("requeue: {}", e)))?;

        Ok(changed as u64)
    }

    // ===== Node Management =====

    fn exists(&self, id: &NodeId) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM nodes WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_new(&mut self, node: &NewNode) -> StorageResult<bool> {
        let now = Self::now();
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO nodes
                 (id, status, display_name, flag_status, origin_worker, discovered_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    node.id.as_str(),
                    NodeStatus::Pending.to_db_string(),
                    node.display_name,
                    node.flag_status.to_db_string(),
                    node.origin_worker,
                    now
                ],
            )
            .map_err(|e| StorageError::Write(format!("insert {}: {}", node.id, e)))?;

        Ok(inserted == 1)
    }

    fn get_node(&self, id: &NodeId) -> StorageResult<Option<NodeRecord>> {
        let sql = format!("SELECT {} FROM nodes WHERE id = ?1", NODE_COLUMNS);
        let node = self
            .conn
            .query_row(&sql, params![id.as_str()], node_from_row)
            .optional()?;
        Ok(node)
    }

    // ===== Statistics =====

    fn count_by_status(&self, status: NodeStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn flag_summary(&self) -> StorageResult<HashMap<FlagStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT flag_status, COUNT(*) FROM nodes GROUP BY flag_status")?;

        let mut summary = HashMap::new();
        let rows = stmt.query_map([], |row| {
            let flag: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((flag, count))
        })?;

        for row in rows {
            let (flag, count) = row?;
            let flag = FlagStatus::from_db_string(&flag).unwrap_or(FlagStatus::Unknown);
            *summary.entry(flag).or_insert(0) += count as u64;
        }

        Ok(summary)
    }

    // ===== Run Management =====

    fn create_run(&mut self, worker_id: &str, config_hash: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (worker_id, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                worker_id,
                Self::now(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), Self::now(), run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, worker_id, started_at, finished_at, config_hash, status
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_node(id: &str) -> NewNode {
        NewNode {
            id: NodeId::new(id),
            display_name: Some(format!("player {}", id)),
            flag_status: FlagStatus::Clean,
            origin_worker: "worker-test".to_string(),
        }
    }

    fn status_of(storage: &SqliteStorage, id: &str) -> NodeStatus {
        storage.get_node(&NodeId::new(id)).unwrap().unwrap().status
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_open_file_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ripple.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.insert_new(&new_node("1")).unwrap();
        }

        // Reopening sees the persisted node
        let storage = SqliteStorage::new(&path).unwrap();
        assert!(storage.exists(&NodeId::new("1")).unwrap());
    }

    #[test]
    fn test_open_unreachable_path_is_connection_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("ripple.db");

        let result = SqliteStorage::new(&path);
        assert!(matches!(result, Err(StorageError::Connection(_))));
    }

    #[test]
    fn test_insert_new_is_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        assert!(storage.insert_new(&new_node("100")).unwrap());

        let mut again = new_node("100");
        again.display_name = Some("someone else".to_string());
        again.flag_status = FlagStatus::VacBanned;
        assert!(!storage.insert_new(&again).unwrap());

        assert_eq!(storage.count_total().unwrap(), 1);

        // Attributes from the first insertion are never overwritten
        let node = storage.get_node(&NodeId::new("100")).unwrap().unwrap();
        assert_eq!(node.display_name.as_deref(), Some("player 100"));
        assert_eq!(node.flag_status, FlagStatus::Clean);
        assert_eq!(node.status, NodeStatus::Pending);
        assert_eq!(node.origin_worker, "worker-test");
    }

    #[test]
    fn test_insert_with_sentinels() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let node = NewNode {
            id: NodeId::new("7"),
            display_name: None,
            flag_status: FlagStatus::Unknown,
            origin_worker: "w".to_string(),
        };
        storage.insert_new(&node).unwrap();

        let stored = storage.get_node(&NodeId::new("7")).unwrap().unwrap();
        assert_eq!(stored.display_name, None);
        assert_eq!(stored.flag_status, FlagStatus::Unknown);
    }

    #[test]
    fn test_exists() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(!storage.exists(&NodeId::new("1")).unwrap());

        storage.insert_new(&new_node("1")).unwrap();
        storage.mark_done(&NodeId::new("1")).unwrap();

        // Presence does not depend on status
        assert!(storage.exists(&NodeId::new("1")).unwrap());
    }

    #[test]
    fn test_get_one_pending_is_fifo() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.get_one_pending().unwrap(), None);

        storage.insert_new(&new_node("3")).unwrap();
        storage.insert_new(&new_node("1")).unwrap();
        storage.insert_new(&new_node("2")).unwrap();

        assert_eq!(storage.get_one_pending().unwrap(), Some(NodeId::new("3")));

        storage.mark_done(&NodeId::new("3")).unwrap();
        assert_eq!(storage.get_one_pending().unwrap(), Some(NodeId::new("1")));
    }

    #[test]
    fn test_claim_pending() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_new(&new_node("1")).unwrap();
        storage.insert_new(&new_node("2")).unwrap();

        let first = storage.claim_pending().unwrap();
        assert_eq!(first, Some(NodeId::new("1")));
        assert_eq!(status_of(&storage, "1"), NodeStatus::InProgress);

        let second = storage.claim_pending().unwrap();
        assert_eq!(second, Some(NodeId::new("2")));

        assert_eq!(storage.claim_pending().unwrap(), None);
    }

    #[test]
    fn test_claim_pending_across_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.db");

        let mut a = SqliteStorage::new(&path).unwrap();
        let mut b = SqliteStorage::new(&path).unwrap();
        a.insert_new(&new_node("1")).unwrap();

        let claimed_a = a.claim_pending().unwrap();
        let claimed_b = b.claim_pending().unwrap();

        assert_eq!(claimed_a, Some(NodeId::new("1")));
        assert_eq!(claimed_b, None);
    }

    #[test]
    fn test_status_never_moves_backwards() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = NodeId::new("1");
        storage.insert_new(&new_node("1")).unwrap();

        storage.mark_in_progress(&id).unwrap();
        assert_eq!(status_of(&storage, "1"), NodeStatus::InProgress);

        // Repeating is a no-op
        storage.mark_in_progress(&id).unwrap();
        assert_eq!(status_of(&storage, "1"), NodeStatus::InProgress);

        storage.mark_done(&id).unwrap();
        storage.mark_done(&id).unwrap();
        assert_eq!(status_of(&storage, "1"), NodeStatus::Done);

        storage.mark_in_progress(&id).unwrap();
        assert_eq!(status_of(&storage, "1"), NodeStatus::Done);
    }

    #[test]
    fn test_mark_done_from_pending() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_new(&new_node("1")).unwrap();

        storage.mark_done(&NodeId::new("1")).unwrap();
        assert_eq!(status_of(&storage, "1"), NodeStatus::Done);
    }

    #[test]
    fn test_mark_unknown_node() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let result = storage.mark_done(&NodeId::new("404"));
        assert!(matches!(result, Err(StorageError::NodeNotFound(_))));
    }

    #[test]
    fn test_requeue_stale_only_touches_old_claims() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for id in ["1", "2", "3", "4"] {
            storage.insert_new(&new_node(id)).unwrap();
        }
        storage.mark_in_progress(&NodeId::new("1")).unwrap();
        storage.mark_in_progress(&NodeId::new("2")).unwrap();
        storage.mark_done(&NodeId::new("3")).unwrap();

        // Backdate node 1's claim
        storage
            .conn
            .execute(
                "UPDATE nodes SET updated_at = '2000-01-01T00:00:00.000Z' WHERE id = '1'",
                [],
            )
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::hours(1);
        let requeued = storage.requeue_stale(cutoff).unwrap();

        assert_eq!(requeued, 1);
        assert_eq!(status_of(&storage, "1"), NodeStatus::Pending);
        assert_eq!(status_of(&storage, "2"), NodeStatus::InProgress);
        assert_eq!(status_of(&storage, "3"), NodeStatus::Done);
        assert_eq!(status_of(&storage, "4"), NodeStatus::Pending);
    }

    #[test]
    fn test_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_new(&new_node("1")).unwrap();
        storage.insert_new(&new_node("2")).unwrap();

        let mut banned = new_node("3");
        banned.flag_status = FlagStatus::VacBanned;
        storage.insert_new(&banned).unwrap();

        storage.mark_done(&NodeId::new("1")).unwrap();

        assert_eq!(storage.count_total().unwrap(), 3);
        assert_eq!(storage.count_by_status(NodeStatus::Pending).unwrap(), 2);
        assert_eq!(storage.count_by_status(NodeStatus::Done).unwrap(), 1);
        assert_eq!(storage.count_by_status(NodeStatus::InProgress).unwrap(), 0);

        let flags = storage.flag_summary().unwrap();
        assert_eq!(flags.get(&FlagStatus::Clean), Some(&2));
        assert_eq!(flags.get(&FlagStatus::VacBanned), Some(&1));
        assert_eq!(flags.get(&FlagStatus::Unknown), None);
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_run().unwrap().is_none());

        let run_id = storage.create_run("worker-a", "abc123").unwrap();
        assert!(run_id > 0);

        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.worker_id, "worker-a");
        assert_eq!(run.config_hash, "abc123");
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        storage.finish_run(run_id, RunStatus::Interrupted).unwrap();
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_finish_unknown_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let result = storage.finish_run(99, RunStatus::Completed);
        assert!(matches!(result, Err(StorageError::RunNotFound(99))));
    }
}
