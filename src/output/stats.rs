//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{decode_links, Storage, StorageError};
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Total number of stored pages
    pub total_pages: u64,

    /// Stored pages per depth, shallowest first
    pub depth_breakdown: BTreeMap<u32, u64>,

    /// Outbound links recorded across all pages
    pub total_links: u64,

    /// Earliest and latest `fetched_at`
    pub first_fetched: Option<String>,
    pub last_fetched: Option<String>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, StorageError> {
    let total_pages = storage.count_pages()?;
    let depth_breakdown = storage.depth_breakdown()?;

    let total_links = storage
        .load_pages()?
        .iter()
        .map(|page| decode_links(&page.links).len() as u64)
        .sum();

    let (first_fetched, last_fetched) = match storage.fetch_window()? {
        Some((first, last)) => (Some(first), Some(last)),
        None => (None, None),
    };

    Ok(CrawlStatistics {
        total_pages,
        depth_breakdown,
        total_links,
        first_fetched,
        last_fetched,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total pages stored: {}", stats.total_pages);
    println!("  Total links recorded: {}", stats.total_links);
    if let (Some(first), Some(last)) = (&stats.first_fetched, &stats.last_fetched) {
        println!("  First fetch: {}", first);
        println!("  Last fetch: {}", last);
    }
    println!();

    if stats.depth_breakdown.is_empty() {
        println!("No pages stored yet.");
        return;
    }

    println!("Pages by Depth:");
    for (depth, count) in &stats.depth_breakdown {
        let percentage = if stats.total_pages > 0 {
            (*count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", depth, count, percentage);
    }
}
