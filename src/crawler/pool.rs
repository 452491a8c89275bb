//! Fixed-size worker pool
//!
//! Each worker owns one render session and loops:
//! 1. Claim a task from the frontier (waits while others may still add work)
//! 2. Fetch and extract the page, retrying retryable failures if configured
//! 3. On failure, log and move on
//! 4. On success, admit every extracted link at `depth + 1`
//! 5. Submit the page record to the persistence pipeline
//!
//! The pool finishes when the frontier reports quiescence and every worker
//! has released its session.

use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher, RenderBackend};
use crate::crawler::frontier::{CrawlTask, Frontier};
use crate::crawler::pipeline::RecordSender;
use crate::storage::PageRecord;
use crate::CrawlError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::Instrument;

/// How failed fetches are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub retries: u32,
    /// Pause before each extra attempt
    pub delay: Duration,
}

impl RetryPolicy {
    /// A single attempt per URL
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Counters updated by the workers
#[derive(Debug, Default)]
pub struct PoolStats {
    pages_fetched: AtomicU64,
    fetch_failures: AtomicU64,
    links_admitted: AtomicU64,
}

impl PoolStats {
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn links_admitted(&self) -> u64 {
        self.links_admitted.load(Ordering::Relaxed)
    }
}

struct Shared {
    frontier: Arc<Frontier>,
    backend: Arc<dyn RenderBackend>,
    fetch_timeout: Duration,
    retry: RetryPolicy,
    stats: Arc<PoolStats>,
}

/// A fixed number of concurrent crawl workers
pub struct WorkerPool {
    workers: usize,
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub fn new(
        workers: usize,
        frontier: Arc<Frontier>,
        backend: Arc<dyn RenderBackend>,
        fetch_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            workers,
            shared: Arc::new(Shared {
                frontier,
                backend,
                fetch_timeout,
                retry,
                stats: Arc::new(PoolStats::default()),
            }),
        }
    }

    /// Counters shared with the running workers
    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.shared.stats)
    }

    /// Runs every worker to completion
    ///
    /// Returns the first fatal error (a session that cannot be opened, a
    /// closed pipeline, a panicked worker). A fatal error closes the
    /// frontier, which makes every worker abandon its current fetch.
    ///
    /// Closing the frontier from outside stops the pool the same way. Each
    /// worker releases its render session before this returns.
    pub async fn run(self, records: RecordSender) -> Result<(), CrawlError> {
        let mut workers = JoinSet::new();

        for id in 0..self.workers {
            let shared = Arc::clone(&self.shared);
            let records = records.clone();
            workers.spawn(
                run_worker(shared, records).instrument(tracing::info_span!("worker", id)),
            );
        }
        drop(records);

        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            let result =
                joined.unwrap_or_else(|e| Err(CrawlError::WorkerPanicked(e.to_string())));

            if let Err(e) = result {
                self.shared.frontier.close();
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    tracing::debug!("Additional worker error: {}", e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn run_worker(shared: Arc<Shared>, records: RecordSender) -> Result<(), CrawlError> {
    let session = match shared.backend.open_session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("{}", e);
            shared.frontier.close();
            return Err(CrawlError::Render(e.to_string()));
        }
    };
    let mut fetcher = Fetcher::new(session, shared.fetch_timeout);
    tracing::debug!("Worker started");

    let result = work_loop(&shared, &mut fetcher, &records).await;

    fetcher.close().await;
    tracing::debug!("Worker stopped");
    result
}

async fn work_loop(
    shared: &Shared,
    fetcher: &mut Fetcher,
    records: &RecordSender,
) -> Result<(), CrawlError> {
    while let Some(claim) = shared.frontier.next().await {
        let task = claim.task().clone();

        let fetched = tokio::select! {
            result = fetch_with_retry(fetcher, &task, shared.retry) => Some(result),
            _ = shared.frontier.closed() => None,
        };
        let Some(fetched) = fetched else {
            tracing::debug!(url = %task.url, "Abandoning fetch, crawl is stopping");
            break;
        };

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                shared.stats.fetch_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(url = %task.url, depth = task.depth, error = %e, "fetch failed");
                continue;
            }
        };
        shared.stats.pages_fetched.fetch_add(1, Ordering::Relaxed);

        let admitted = admit_links(&shared.frontier, &task, &page);
        shared
            .stats
            .links_admitted
            .fetch_add(admitted as u64, Ordering::Relaxed);

        tracing::info!(
            url = %task.url,
            final_url = %page.final_url,
            depth = task.depth,
            links = page.links.len(),
            admitted,
            "Fetched page"
        );

        let record = PageRecord::new(
            task.url.as_str(),
            page.title,
            task.depth,
            page.links.iter().map(|link| link.to_string()).collect(),
        );

        // Held until the record is queued so quiescence cannot be reported
        // while this page is still on its way to storage
        if let Err(e) = records.submit(record).await {
            shared.frontier.close();
            return Err(e);
        }
        drop(claim);
    }

    Ok(())
}

fn admit_links(frontier: &Frontier, task: &CrawlTask, page: &FetchedPage) -> usize {
    let Some(next_depth) = task.depth.checked_add(1) else {
        return 0;
    };
    if next_depth > frontier.max_depth() {
        return 0;
    }

    page.links
        .iter()
        .filter(|link| frontier.admit_and_enqueue((*link).clone(), next_depth))
        .count()
}

async fn fetch_with_retry(
    fetcher: &mut Fetcher,
    task: &CrawlTask,
    retry: RetryPolicy,
) -> Result<FetchedPage, FetchError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(&task.url).await {
            Ok(page) => return Ok(page),
            Err(e) if e.is_retryable() && attempt < retry.retries => {
                attempt += 1;
                tracing::debug!(
                    url = %task.url,
                    attempt,
                    "Retrying after: {}", e
                );
                tokio::time::sleep(retry.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
