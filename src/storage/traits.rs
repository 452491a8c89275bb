//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{InsertOutcome, PageRecord, StoredPage};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// All of these are fatal to the writer: once the storage target cannot be
/// written, nothing the crawl produces can be kept.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage target unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The persistence pipeline is generic over this trait so the writer loop
/// does not depend on SQLite directly.
pub trait Storage {
    // ===== Writes =====

    /// Inserts a page inside its own transaction
    ///
    /// A unique-constraint conflict on `url` is not an error: the existing
    /// row wins and [`InsertOutcome::Duplicate`] is returned.
    fn insert_page(&mut self, record: &PageRecord) -> StorageResult<InsertOutcome>;

    // ===== Reads =====

    /// Returns every stored page, ordered by row id
    fn load_pages(&self) -> StorageResult<Vec<StoredPage>>;

    /// Gets a page by URL
    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<StoredPage>>;

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;

    /// Gets page count breakdown by depth
    fn depth_breakdown(&self) -> StorageResult<BTreeMap<u32, u64>>;

    /// Earliest and latest `fetched_at` timestamps, if any page exists
    fn fetch_window(&self) -> StorageResult<Option<(String, String)>>;
}
