//! Depthcrawl main entry point
//!
//! This is the command-line interface for the Depthcrawl crawler.

use anyhow::{bail, Context};
use clap::Parser;
use depthcrawl::config::{load_config_with_hash, validate, Config};
use depthcrawl::output::{load_statistics, print_statistics};
use depthcrawl::storage::{open_storage, Storage};
use depthcrawl::{CrawlSummary, Crawler};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Depthcrawl: a bounded-depth, resumable web crawler
///
/// Crawls outward from a seed URL up to a maximum link depth and records
/// every fetched page in a SQLite database. Running again against the same
/// database resumes where the previous run stopped.
#[derive(Parser, Debug)]
#[command(name = "depthcrawl")]
#[command(version)]
#[command(about = "A bounded-depth, resumable web crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from (depth 0)
    #[arg(value_name = "SEED_URL")]
    seed_url: Option<String>,

    /// Maximum link depth to follow from the seed
    #[arg(value_name = "MAX_DEPTH")]
    max_depth: Option<u32>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database to write to (and resume from)
    #[arg(long, value_name = "PATH")]
    db_file: Option<String>,

    /// Number of concurrent workers
    #[arg(long, value_name = "N")]
    max_threads: Option<u32>,

    /// Capacity of the queue between workers and the database writer
    #[arg(long, value_name = "N")]
    queue_capacity: Option<u32>,

    /// Only follow links on the seed's host
    #[arg(long)]
    same_domain_only: bool,

    /// Per-page load timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Extra attempts for timeouts, network errors and 5xx responses
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Command-line values win over the config file
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(seed_url) = &self.seed_url {
            config.crawler.seed_url = seed_url.clone();
        }
        if let Some(max_depth) = self.max_depth {
            config.crawler.max_depth = max_depth;
        }
        if let Some(db_file) = &self.db_file {
            config.output.database_path = db_file.clone();
        }
        if let Some(workers) = self.max_threads {
            config.crawler.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.crawler.queue_capacity = capacity;
        }
        if self.same_domain_only {
            config.crawler.same_domain_only = true;
        }
        if let Some(timeout) = self.timeout_secs {
            config.render.timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.crawler.fetch_retries = retries;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);

    // Handle different modes
    if cli.stats {
        handle_stats(&config)
    } else {
        validate(&config).context("Invalid configuration")?;
        if cli.dry_run {
            handle_dry_run(&config)
        } else {
            handle_crawl(config).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("depthcrawl=info,warn"),
            1 => EnvFilter::new("depthcrawl=debug,info"),
            2 => EnvFilter::new("depthcrawl=trace,debug"),
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

/// Handles the --dry-run mode: shows the merged configuration and whether
/// the database would be resumed
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Depthcrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Queue capacity: {}", config.crawler.queue_capacity);
    println!("  Same domain only: {}", config.crawler.same_domain_only);
    println!(
        "  Fetch retries: {} ({}ms apart)",
        config.crawler.fetch_retries, config.crawler.retry_delay_ms
    );

    println!("\nRender:");
    println!("  User agent: {}", config.render.user_agent);
    println!("  Timeout: {}s", config.render.timeout_secs);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");

    let db_path = Path::new(&config.output.database_path);
    if db_path.exists() {
        let storage = open_storage(db_path)?;
        let pages = storage.count_pages()?;
        if pages > 0 {
            println!("✓ Would resume from {} stored pages", pages);
            return Ok(());
        }
    }
    println!("✓ Would start a fresh crawl from {}", config.crawler.seed_url);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let db_path = Path::new(&config.output.database_path);
    if !db_path.exists() {
        bail!("Database not found: {}", db_path.display());
    }

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(db_path)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let crawler = Crawler::new(config)?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::warn!("Received Ctrl-C, stopping after queued records are saved"),
            Err(e) => {
                tracing::error!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    match crawler.run_until(shutdown).await {
        Ok(summary) => {
            report_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn report_summary(summary: &CrawlSummary) {
    if summary.resumed {
        tracing::info!("Resumed with {} pages already stored", summary.rehydrated);
    }
    tracing::info!(
        "Fetched {} pages ({} failed), wrote {} records ({} duplicates skipped)",
        summary.pages_fetched,
        summary.fetch_failures,
        summary.records_written,
        summary.duplicates_skipped
    );
    if summary.interrupted {
        tracing::warn!("Crawl was interrupted; run again with the same database to resume");
    }
}
