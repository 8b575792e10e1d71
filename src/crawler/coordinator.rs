//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that walks the friend graph:
//! - Selecting the next node (seed on the first cycle, then the stored frontier)
//! - Extracting its contacts and resolving them to canonical ids
//! - Enriching and inserting newly discovered nodes
//! - Marking processed nodes done and recording the run
//!
//! The loop is strictly sequential. All durable state lives in the node store,
//! so a stopped crawl resumes from whatever is still pending.

use crate::config::Config;
use crate::contacts::{ContactExtractor, FriendsPageExtractor};
use crate::crawler::{HttpFetcher, ShutdownHandle};
use crate::enrichment::{Enricher, SteamWebApiEnricher};
use crate::identity::{IdentityResolver, NodeId, ResolveError, SteamIdentityResolver};
use crate::state::FlagStatus;
use crate::storage::{open_storage, NewNode, NodeStore, RunStatus};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counters describing what a crawl run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Nodes taken through a full cycle and marked done
    pub nodes_processed: u64,
    /// Newly discovered nodes added to the frontier
    pub neighbors_inserted: u64,
    /// References that resolved to a node already in the store
    pub neighbors_known: u64,
    /// References dropped because they could not be resolved or stored
    pub references_skipped: u64,
    /// Nodes whose contact extraction failed
    pub extraction_failures: u64,
    /// True if the run stopped on a shutdown request rather than an empty frontier
    pub cancelled: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    store: Box<dyn NodeStore + Send>,
    resolver: Box<dyn IdentityResolver>,
    extractor: Box<dyn ContactExtractor>,
    enricher: Box<dyn Enricher>,
    worker_id: String,
    config_hash: String,
    stale_after: Option<Duration>,
    visited: HashSet<NodeId>,
    shutdown: ShutdownHandle,
}

impl Coordinator {
    /// Creates a coordinator from its collaborators
    ///
    /// Reconciliation is disabled until [`Coordinator::with_stale_after`] sets a
    /// threshold.
    pub fn new(
        store: Box<dyn NodeStore + Send>,
        resolver: Box<dyn IdentityResolver>,
        extractor: Box<dyn ContactExtractor>,
        enricher: Box<dyn Enricher>,
        worker_id: impl Into<String>,
        config_hash: impl Into<String>,
    ) -> Self {
        Self {
            store,
            resolver,
            extractor,
            enricher,
            worker_id: worker_id.into(),
            config_hash: config_hash.into(),
            stale_after: None,
            visited: HashSet::new(),
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Sets the age after which an in-progress claim is requeued at startup
    pub fn with_stale_after(mut self, stale_after: Option<Duration>) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Replaces the shutdown handle, e.g. to share one created earlier
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Creates a coordinator wired to Steam and the configured database
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawler configuration
    /// * `config_hash` - Hash of the config file, recorded with each run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(RippleError)` - The HTTP client or the database could not be set up
    pub fn from_config(config: &Config, config_hash: &str) -> Result<Self> {
        let api_url = config.steam.api_url()?;
        let community_url = config.steam.community_url()?;
        let api_key = config.steam.api_key()?.to_string();

        let fetcher = Arc::new(HttpFetcher::from_config(config)?);
        let store = open_storage(Path::new(&config.output.database_path))?;

        let resolver =
            SteamIdentityResolver::new(Arc::clone(&fetcher), api_url.clone(), api_key.clone());
        let extractor = FriendsPageExtractor::new(Arc::clone(&fetcher), community_url);
        let enricher = SteamWebApiEnricher::new(fetcher, api_url, api_key);

        let coordinator = Self::new(
            Box::new(store),
            Box::new(resolver),
            Box::new(extractor),
            Box::new(enricher),
            config.crawler.worker_id.clone(),
            config_hash,
        )
        .with_stale_after(config.crawler.stale_after());

        Ok(coordinator)
    }

    /// Returns a handle that stops the crawl after the current node
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Read access to the underlying node store
    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    /// Returns stale in-progress nodes to the frontier
    ///
    /// Claims older than the configured threshold belong to workers that died
    /// mid-node. Returns the number of requeued nodes; 0 if reconciliation is
    /// disabled.
    pub fn reconcile(&mut self) -> Result<u64> {
        let Some(stale_after) = self.stale_after else {
            tracing::debug!("Reconciliation disabled");
            return Ok(0);
        };

        let cutoff = stale_cutoff(Utc::now(), stale_after);
        let requeued = self.store.requeue_stale(cutoff)?;

        if requeued > 0 {
            tracing::info!(requeued, cutoff = %cutoff, "Requeued stale in-progress nodes");
        } else {
            tracing::debug!(cutoff = %cutoff, "No stale in-progress nodes");
        }

        Ok(requeued)
    }

    /// Runs the crawl loop until the frontier is empty or shutdown is requested
    ///
    /// `seed` is only consulted on the first cycle. If it cannot be resolved the
    /// crawl continues from the stored frontier.
    ///
    /// Per-node and per-reference failures are logged and absorbed. Only store
    /// failures while selecting the next node end the run with an error.
    pub async fn run(&mut self, seed: Option<&str>) -> Result<CrawlSummary> {
        self.reconcile()?;

        let run_id = self.store.create_run(&self.worker_id, &self.config_hash)?;
        tracing::info!(run_id, worker = %self.worker_id, "Starting crawl run");
        let start_time = Instant::now();

        match self.crawl_loop(seed).await {
            Ok(summary) => {
                let status = if summary.cancelled {
                    RunStatus::Interrupted
                } else {
                    RunStatus::Completed
                };
                self.store.finish_run(run_id, status)?;

                tracing::info!(
                    run_id,
                    processed = summary.nodes_processed,
                    inserted = summary.neighbors_inserted,
                    known = summary.neighbors_known,
                    skipped = summary.references_skipped,
                    extraction_failures = summary.extraction_failures,
                    "Crawl run {} in {:?}",
                    status.to_db_string(),
                    start_time.elapsed()
                );
                Ok(summary)
            }
            Err(e) => {
                if let Err(finish_err) = self.store.finish_run(run_id, RunStatus::Failed) {
                    tracing::error!(run_id, error = %finish_err, "Failed to record run failure");
                }
                Err(e)
            }
        }
    }

    async fn crawl_loop(&mut self, seed: Option<&str>) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary::default();
        let mut seed = seed;
        let start_time = Instant::now();

        loop {
            if self.shutdown.is_requested() {
                tracing::info!("Shutdown requested, stopping before the next node");
                summary.cancelled = true;
                break;
            }

            let selected = match seed.take() {
                Some(reference) => match self.select_seed(reference).await? {
                    Some(node) => Some(node),
                    None => self.store.claim_pending()?,
                },
                None => self.store.claim_pending()?,
            };

            let Some(node) = selected else {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            };

            tracing::info!(node = %node, "Claimed node");
            self.process_node(&node, &mut summary).await;

            if summary.nodes_processed % 10 == 0 {
                let rate = summary.nodes_processed as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} nodes processed, {} discovered, {:.2} nodes/sec",
                    summary.nodes_processed,
                    summary.neighbors_inserted,
                    rate
                );
            }
        }

        Ok(summary)
    }

    /// Resolves the seed and makes sure it is stored and claimed
    ///
    /// Returns `Ok(None)` when the reference cannot be resolved.
    async fn select_seed(&mut self, reference: &str) -> Result<Option<NodeId>> {
        let id = match self.resolver.resolve(reference).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    seed = reference,
                    error = %e,
                    "Seed could not be resolved, continuing from the stored frontier"
                );
                return Ok(None);
            }
        };

        if !self.store.exists(&id)? {
            let node = self.enrich(&id).await;
            if self.store.insert_new(&node)? {
                tracing::info!(node = %id, "Inserted seed");
            }
        }

        if let Err(e) = self.store.mark_in_progress(&id) {
            tracing::warn!(node = %id, error = %e, "Failed to mark seed in progress");
        }

        Ok(Some(id))
    }

    /// Takes one claimed node through extraction and discovery, then marks it done
    async fn process_node(&mut self, node: &NodeId, summary: &mut CrawlSummary) {
        if !self.visited.insert(node.clone()) {
            tracing::debug!(node = %node, "Already processed in this run, skipping extraction");
        } else {
            match self.extractor.extract_contacts(node).await {
                Ok(references) => {
                    tracing::debug!(node = %node, count = references.len(), "Extracted contacts");
                    for reference in &references {
                        self.discover(node, reference, summary).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        node = %node,
                        error = %e,
                        "Contact extraction failed, treating node as having no contacts"
                    );
                    summary.extraction_failures += 1;
                }
            }
        }

        match self.store.mark_done(node) {
            Ok(()) => tracing::info!(node = %node, "Node done"),
            Err(e) => tracing::error!(node = %node, error = %e, "Failed to mark node done"),
        }
        summary.nodes_processed += 1;
    }

    /// Resolves one raw reference and inserts it if it is new
    async fn discover(&mut self, origin: &NodeId, reference: &str, summary: &mut CrawlSummary) {
        let id = match self.resolver.resolve(reference).await {
            Ok(id) => id,
            Err(e @ ResolveError::Malformed(_)) => {
                tracing::debug!(from = %origin, error = %e, "Skipping reference");
                summary.references_skipped += 1;
                return;
            }
            Err(e) => {
                tracing::warn!(from = %origin, error = %e, "Skipping unresolvable reference");
                summary.references_skipped += 1;
                return;
            }
        };

        match self.store.exists(&id) {
            Ok(true) => {
                tracing::trace!(node = %id, "Already known");
                summary.neighbors_known += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(node = %id, error = %e, "Presence check failed, skipping");
                summary.references_skipped += 1;
                return;
            }
        }

        let new_node = self.enrich(&id).await;
        match self.store.insert_new(&new_node) {
            Ok(true) => {
                tracing::info!(node = %id, from = %origin, "Discovered new node");
                summary.neighbors_inserted += 1;
            }
            Ok(false) => {
                tracing::debug!(node = %id, "Inserted concurrently by another worker");
                summary.neighbors_known += 1;
            }
            Err(e) => {
                tracing::error!(node = %id, error = %e, "Failed to insert node");
                summary.references_skipped += 1;
            }
        }
    }

    /// Looks up the node's attributes, substituting unknown for failed lookups
    async fn enrich(&self, id: &NodeId) -> NewNode {
        let display_name = match self.enricher.fetch_display_name(id).await {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::warn!(node = %id, error = %e, "Display name lookup failed");
                None
            }
        };

        let flag_status = match self.enricher.fetch_flag_status(id).await {
            Ok(flag) => flag,
            Err(e) => {
                tracing::warn!(node = %id, error = %e, "Flag status lookup failed");
                FlagStatus::Unknown
            }
        };

        NewNode {
            id: id.clone(),
            display_name,
            flag_status,
            origin_worker: self.worker_id.clone(),
        }
    }
}

fn stale_cutoff(now: DateTime<Utc>, stale_after: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(stale_after)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Runs a complete crawl from a configuration
///
/// The explicit `seed` takes precedence over `crawler.seed` from the config.
///
/// # Example
///
/// ```no_run
/// use steam_ripple::config::load_config_with_hash;
/// use steam_ripple::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let summary = run_crawl(&config, &hash, None).await?;
/// println!("processed {} nodes", summary.nodes_processed);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    config_hash: &str,
    seed: Option<&str>,
) -> Result<CrawlSummary> {
    let mut coordinator = Coordinator::from_config(config, config_hash)?;
    let seed = seed.or(config.crawler.seed.as_deref());
    coordinator.run(seed).await
}
