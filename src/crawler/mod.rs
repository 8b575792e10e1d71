//! Crawler module for profile fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and pacing
//! - The resumable crawl loop over the node store
//! - Cooperative shutdown

mod coordinator;
mod fetcher;
mod pacer;
mod retry;
mod shutdown;

pub use coordinator::{run_crawl, Coordinator, CrawlSummary};
pub use fetcher::{build_http_client, endpoint, redact_url, FetchError, HttpFetcher};
pub use pacer::Pacer;
pub use retry::RetryPolicy;
pub use shutdown::ShutdownHandle;
