//! Crawler coordinator - wires the crawl together
//!
//! A run goes through these steps:
//! - Parse the seed and build the frontier (with the configured scope)
//! - Open storage and rehydrate the frontier from it
//! - Start the persistence pipeline, handing it the storage handle
//! - Run the worker pool until the frontier is quiescent or shutdown fires
//! - Drain the pipeline and report what happened

use crate::config::{validate, Config};
use crate::crawler::fetcher::{HttpRenderer, RenderBackend};
use crate::crawler::frontier::{Frontier, Scope};
use crate::crawler::pipeline::Pipeline;
use crate::crawler::pool::{RetryPolicy, WorkerPool};
use crate::crawler::resume::{self, ResumeOutcome};
use crate::storage::open_storage;
use crate::url::parse_seed;
use crate::CrawlError;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// What a finished (or interrupted) crawl did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Storage already held rows when the crawl started
    pub resumed: bool,
    /// Stored pages marked visited during rehydration
    pub rehydrated: usize,
    pub pages_fetched: u64,
    pub fetch_failures: u64,
    /// Links admitted to the frontier by workers (seed and requeued links excluded)
    pub links_admitted: u64,
    pub records_written: u64,
    pub duplicates_skipped: u64,
    /// The crawl was stopped before reaching quiescence
    pub interrupted: bool,
}

/// A configured crawl, ready to run against its storage target
pub struct Crawler {
    config: Config,
    backend: Arc<dyn RenderBackend>,
}

impl Crawler {
    /// Creates a crawler that fetches pages over HTTP
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        validate(&config)?;
        let backend =
            HttpRenderer::new(&config.render).map_err(|e| CrawlError::Render(e.to_string()))?;
        Ok(Self {
            config,
            backend: Arc::new(backend),
        })
    }

    /// Creates a crawler that fetches pages through `backend`
    pub fn with_backend(config: Config, backend: Arc<dyn RenderBackend>) -> Result<Self, CrawlError> {
        validate(&config)?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs until the frontier is quiescent
    pub async fn run(&self) -> Result<CrawlSummary, CrawlError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs until the frontier is quiescent or `shutdown` completes
    ///
    /// On shutdown, in-flight fetches are abandoned but every worker still
    /// releases its render session, and every record already submitted is
    /// written before this returns. A storage failure takes
    /// precedence over any worker error.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<CrawlSummary, CrawlError>
    where
        F: Future<Output = ()>,
    {
        let crawler = &self.config.crawler;
        let seed = parse_seed(&crawler.seed_url)?;

        let scope = if crawler.same_domain_only {
            Scope::SameHost(seed.clone())
        } else {
            Scope::Any
        };
        let frontier = Arc::new(Frontier::with_scope(crawler.max_depth, scope));

        let db_path = Path::new(&self.config.output.database_path);
        let storage = open_storage(db_path)?;
        let outcome = resume::rehydrate(&storage, &frontier, &seed)?;

        let mut summary = CrawlSummary::default();
        if let ResumeOutcome::Resumed { pages, .. } = outcome {
            summary.resumed = true;
            summary.rehydrated = pages;
        }

        tracing::info!(
            seed = %seed,
            max_depth = crawler.max_depth,
            workers = crawler.workers,
            database = %db_path.display(),
            "Starting crawl"
        );
        let start_time = std::time::Instant::now();

        let pipeline = Pipeline::spawn(storage, crawler.queue_capacity as usize);
        let records = pipeline.sender().ok_or(CrawlError::PipelineClosed)?;

        let retry = RetryPolicy {
            retries: crawler.fetch_retries,
            delay: Duration::from_millis(crawler.retry_delay_ms),
        };
        let pool = WorkerPool::new(
            crawler.workers as usize,
            Arc::clone(&frontier),
            Arc::clone(&self.backend),
            Duration::from_secs(self.config.render.timeout_secs),
            retry,
        );
        let stats = pool.stats();

        let run = pool.run(records);
        tokio::pin!(run);

        let finished = tokio::select! {
            result = &mut run => Some(result),
            _ = shutdown => None,
        };
        let pool_result = match finished {
            Some(result) => result,
            None => {
                tracing::warn!("Shutdown requested, abandoning in-flight fetches");
                summary.interrupted = true;
                // Workers see the closed frontier, drop their current fetch
                // and release their sessions
                frontier.close();
                run.await
            }
        };

        let report = match (pipeline.shutdown().await, pool_result) {
            (Err(e), _) | (Ok(_), Err(e)) => {
                tracing::error!("Crawl aborted: {}", e);
                return Err(e);
            }
            (Ok(report), Ok(())) => report,
        };

        summary.pages_fetched = stats.pages_fetched();
        summary.fetch_failures = stats.fetch_failures();
        summary.links_admitted = stats.links_admitted();
        summary.records_written = report.written;
        summary.duplicates_skipped = report.duplicates;

        tracing::info!(
            pages = summary.pages_fetched,
            failures = summary.fetch_failures,
            written = summary.records_written,
            "Crawl {} in {:?}",
            if summary.interrupted { "interrupted" } else { "completed" },
            start_time.elapsed()
        );

        Ok(summary)
    }
}

/// Runs a complete crawl over HTTP with the given configuration
pub async fn run_crawl(config: Config) -> Result<CrawlSummary, CrawlError> {
    Crawler::new(config)?.run().await
}
