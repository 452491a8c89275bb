//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler:
//! - SQLite database initialization and schema management
//! - Idempotent page inserts (unique `url`, conflicts are skipped)
//! - Full-table scans used by the resume manager
//! - The serialization boundary for the `links` column
//!
//! Only the persistence pipeline's writer ever holds a [`SqliteStorage`]
//! for writing; everything else reads.

mod codec;
mod schema;
mod sqlite;
mod traits;

pub use codec::{decode_links, encode_links};
pub use schema::{initialize_schema, SCHEMA_VERSION};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::path::Path;

/// Opens (creating if needed) the storage target at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A successfully fetched page, ready to be written
///
/// Built by a worker; ownership moves to the persistence pipeline on submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub depth: u32,
    /// Outbound links in extraction order, without repeats
    pub links: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl PageRecord {
    /// Creates a record stamped with the current time
    pub fn new(url: impl Into<String>, title: impl Into<String>, depth: u32, links: Vec<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            depth,
            links,
            fetched_at: Utc::now(),
        }
    }
}

/// A row of the `pages` table as read back from storage
///
/// `links` stays in its encoded form; only the resume manager decodes it.
#[derive(Debug, Clone)]
pub struct StoredPage {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub depth: u32,
    pub links: String,
    pub fetched_at: String,
}

/// What happened to a single insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted,
    /// A row with the same URL already existed; nothing was written
    Duplicate,
}
