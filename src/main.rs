//! Steam-Ripple main entry point
//!
//! This is the command-line interface for the Steam-Ripple friend-graph crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use steam_ripple::config::{load_config_with_hash, Config};
use steam_ripple::identity::{parse_profile_ref, ProfileRef};
use steam_ripple::output::{load_statistics, print_statistics};
use steam_ripple::storage::open_storage;
use steam_ripple::Coordinator;
use tracing_subscriber::EnvFilter;

/// Steam-Ripple: a resumable friend-graph crawler for Steam profiles
///
/// Steam-Ripple walks friends lists outward from a seed profile, recording
/// every profile it discovers along with its display name and ban status.
/// Progress lives in the database, so a stopped crawl resumes where it left off.
#[derive(Parser, Debug)]
#[command(name = "steam-ripple")]
#[command(version)]
#[command(about = "A resumable friend-graph crawler for Steam profiles", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Profile to start from (SteamID64 or profile URL); overrides crawler.seed
    #[arg(long, value_name = "REF")]
    seed: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "reconcile"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "reconcile"])]
    stats: bool,

    /// Return stale in-progress nodes to the frontier and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    reconcile: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let seed = cli.seed.as_deref().or(config.crawler.seed.as_deref());

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, seed)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.reconcile {
        handle_reconcile(&config, &config_hash)
    } else {
        handle_crawl(&config, &config_hash, seed).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("steam_ripple=info,warn"),
            1 => EnvFilter::new("steam_ripple=debug,info"),
            2 => EnvFilter::new("steam_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, seed: Option<&str>) -> anyhow::Result<()> {
    println!("=== Steam-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Worker id: {}", config.crawler.worker_id);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Retries: {} (base delay {}ms)",
        config.crawler.max_retries, config.crawler.retry_base_delay_ms
    );
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    match config.crawler.stale_after_secs {
        0 => println!("  Reconciliation: disabled"),
        secs => println!("  Reconciliation: claims older than {}s", secs),
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nSteam:");
    println!("  Community: {}", config.steam.community_url);
    println!("  Web API: {}", config.steam.api_url);
    println!("  API key: {}", mask_key(config.steam.api_key()?));

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!();
    match seed {
        Some(reference) => {
            let parsed = parse_profile_ref(reference)
                .with_context(|| format!("Seed '{}' is not a profile reference", reference))?;
            match parsed {
                ProfileRef::Canonical(id) => println!("Seed: {} (SteamID64)", id),
                ProfileRef::Vanity(name) => {
                    println!("Seed: vanity name '{}' (resolved at start)", name)
                }
            }
        }
        None => println!("Seed: none, crawl continues from the stored frontier"),
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    let stats = load_statistics(&storage).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --reconcile mode: requeues abandoned claims
fn handle_reconcile(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let mut coordinator = Coordinator::from_config(config, config_hash)?;

    if config.crawler.stale_after().is_none() {
        println!("Reconciliation is disabled (stale-after-secs = 0)");
        return Ok(());
    }

    let requeued = coordinator
        .reconcile()
        .context("Reconciliation sweep failed")?;
    println!("✓ Requeued {} stale in-progress node(s)", requeued);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str, seed: Option<&str>) -> anyhow::Result<()> {
    let mut coordinator = Coordinator::from_config(config, config_hash)?;

    // Ctrl-C finishes the current node and then stops
    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current node");
            shutdown.request();
        }
    });

    match seed {
        Some(reference) => tracing::info!(seed = reference, "Starting crawl from seed"),
        None => tracing::info!("Starting crawl from stored frontier"),
    }

    let summary = coordinator.run(seed).await.map_err(|e| {
        tracing::error!("Crawl failed: {}", e);
        e
    })?;

    if summary.cancelled {
        tracing::info!(
            "Crawl interrupted after {} node(s); rerun to resume",
            summary.nodes_processed
        );
    } else {
        tracing::info!(
            "Crawl completed: {} node(s) processed, {} discovered",
            summary.nodes_processed,
            summary.neighbors_inserted
        );
    }

    Ok(())
}

fn mask_key(key: &str) -> String {
    let visible: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if key.chars().count() > 8 {
        format!("****{}", visible)
    } else {
        "****".to_string()
    }
}
