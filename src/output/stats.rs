//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::{FlagStatus, NodeStatus};
use crate::storage::{NodeStore, RunRecord, StorageResult};
use std::collections::HashMap;
use std::fmt::Write;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of nodes ever discovered
    pub total_nodes: u64,

    /// Count of nodes by status
    pub nodes_by_status: HashMap<NodeStatus, u64>,

    /// Count of nodes by flag status
    pub flag_summary: HashMap<FlagStatus, u64>,

    /// Most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    pub fn count(&self, status: NodeStatus) -> u64 {
        self.nodes_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Nodes whose flag status is one of the ban variants
    pub fn flagged(&self) -> u64 {
        self.flag_summary
            .iter()
            .filter(|(flag, _)| flag.is_flagged())
            .map(|(_, count)| count)
            .sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The node store to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn NodeStore) -> StorageResult<CrawlStatistics> {
    let total_nodes = storage.count_total()?;

    let mut nodes_by_status = HashMap::new();
    for status in NodeStatus::all_statuses() {
        nodes_by_status.insert(status, storage.count_by_status(status)?);
    }

    let flag_summary = storage.flag_summary()?;
    let latest_run = storage.get_latest_run()?;

    Ok(CrawlStatistics {
        total_nodes,
        nodes_by_status,
        flag_summary,
        latest_run,
    })
}

/// Formats statistics as a human-readable report
pub fn render_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    let _ = writeln!(out, "Nodes by Status:");
    for status in NodeStatus::all_statuses() {
        let count = stats.count(status);
        let _ = writeln!(
            out,
            "  {}: {} ({:.1}%)",
            status,
            count,
            percentage(count, stats.total_nodes)
        );
    }
    let _ = writeln!(out, "  total: {}", stats.total_nodes);
    let _ = writeln!(out);

    let _ = writeln!(out, "Flag Summary:");
    for flag in FlagStatus::all_statuses() {
        if let Some(count) = stats.flag_summary.get(&flag) {
            let _ = writeln!(out, "  {}: {}", flag, count);
        }
    }
    let _ = writeln!(
        out,
        "  flagged: {} ({:.1}%)",
        stats.flagged(),
        percentage(stats.flagged(), stats.total_nodes)
    );
    let _ = writeln!(out);

    match &stats.latest_run {
        Some(run) => {
            let _ = writeln!(out, "Latest Run:");
            let _ = writeln!(out, "  id: {}", run.id);
            let _ = writeln!(out, "  worker: {}", run.worker_id);
            let _ = writeln!(out, "  status: {}", run.status.to_db_string());
            let _ = writeln!(out, "  started: {}", run.started_at);
            let _ = writeln!(
                out,
                "  finished: {}",
                run.finished_at.as_deref().unwrap_or("-")
            );
            let _ = writeln!(out, "  config hash: {}", run.config_hash);
        }
        None => {
            let _ = writeln!(out, "No crawl runs recorded");
        }
    }

    out
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", render_statistics(stats));
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
