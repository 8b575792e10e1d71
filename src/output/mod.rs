//! Output module for reporting on the crawl database
//!
//! This module handles:
//! - Collecting node and flag statistics from the store
//! - Rendering them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, render_statistics, CrawlStatistics};
