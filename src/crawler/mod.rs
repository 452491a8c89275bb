//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The shared frontier and its atomic admit
//! - Page rendering and link extraction
//! - The worker pool and the single-writer persistence pipeline
//! - Rehydrating crawl state from storage
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod pipeline;
mod pool;
mod resume;

#[cfg(test)]
mod testing;

pub use coordinator::{run_crawl, CrawlSummary, Crawler};
pub use fetcher::{
    build_http_client, extract_page, FetchError, FetchedPage, Fetcher, HttpRenderer,
    RenderBackend, RenderSession, RenderedPage, SessionError,
};
pub use frontier::{Claim, CrawlTask, Frontier, Scope};
pub use parser::{extract_anchors, extract_title, parse_document, Anchor};
pub use pipeline::{Pipeline, RecordSender, WriterReport};
pub use pool::{PoolStats, RetryPolicy, WorkerPool};
pub use resume::{rehydrate, ResumeOutcome};
