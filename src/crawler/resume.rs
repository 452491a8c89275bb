//! Rebuilds the frontier from a previous run's rows
//!
//! Every stored URL is marked visited at its stored depth so it is never
//! fetched again. The stored links of every page are then admitted at
//! `depth + 1`; whatever was discovered but never written gets queued.

use crate::crawler::frontier::Frontier;
use crate::storage::{decode_links, Storage, StorageError};
use url::Url;

/// How the frontier was seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// Storage was empty; only the seed was queued
    Fresh,
    /// Storage held rows from an earlier run
    Resumed {
        /// Rows marked visited
        pages: usize,
        /// Tasks queued, including the seed if it was never stored
        requeued: usize,
    },
}

impl ResumeOutcome {
    pub fn is_resumed(&self) -> bool {
        matches!(self, ResumeOutcome::Resumed { .. })
    }
}

/// Seeds `frontier` from `storage` and the seed URL
///
/// Running this twice against the same rows produces the same frontier.
pub fn rehydrate<S>(storage: &S, frontier: &Frontier, seed: &Url) -> Result<ResumeOutcome, StorageError>
where
    S: Storage + ?Sized,
{
    let mut pages = storage.load_pages()?;

    if pages.is_empty() {
        frontier.admit_and_enqueue(seed.clone(), 0);
        tracing::info!(seed = %seed, "Starting fresh crawl");
        return Ok(ResumeOutcome::Fresh);
    }

    for page in &pages {
        frontier.mark_visited(&page.url, page.depth);
    }

    let mut requeued = 0;
    if frontier.admit_and_enqueue(seed.clone(), 0) {
        requeued += 1;
    }

    // Shallow pages first, so a link reachable from several stored pages
    // gets the smallest depth
    pages.sort_by_key(|page| (page.depth, page.id));

    for page in &pages {
        let Some(next_depth) = page.depth.checked_add(1) else {
            continue;
        };
        if next_depth > frontier.max_depth() {
            continue;
        }

        for link in decode_links(&page.links) {
            match Url::parse(&link) {
                Ok(url) => {
                    if frontier.admit_and_enqueue(url, next_depth) {
                        requeued += 1;
                    }
                }
                Err(e) => {
                    tracing::debug!(url = %page.url, link = %link, "Skipping stored link: {}", e);
                }
            }
        }
    }

    tracing::info!(
        pages = pages.len(),
        requeued,
        "Resuming from existing database"
    );

    Ok(ResumeOutcome::Resumed {
        pages: pages.len(),
        requeued,
    })
}
