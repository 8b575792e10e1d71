//! Steam-Ripple: a resumable friend-graph crawler for Steam community profiles
//!
//! This crate walks the friends lists of Steam profiles, starting from a seed
//! or from whatever is still pending in its database, and records every
//! newly discovered profile together with its display name and ban status.
//! Node status is persisted so an interrupted crawl picks up where it left off.

pub mod config;
pub mod contacts;
pub mod crawler;
pub mod enrichment;
pub mod identity;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Steam-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Identity resolution error: {0}")]
    Resolve(#[from] identity::ResolveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid seed reference: {0}")]
    InvalidSeed(String),
}

/// Result type alias for Steam-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlSummary, ShutdownHandle};
pub use identity::NodeId;
pub use state::{FlagStatus, NodeStatus};
