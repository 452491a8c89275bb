//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::codec::encode_links;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{InsertOutcome, PageRecord, StoredPage};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const PAGE_COLUMNS: &str = "id, url, title, depth, links, fetched_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// A missing parent directory or an unreadable file is reported as
    /// [`StorageError::Unavailable`].
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            StorageError::Unavailable(format!("cannot open {}: {}", path.display(), e))
        })?;

        // WAL lets the stats reader run next to the single writer
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn page_from_row(row: &Row<'_>) -> rusqlite::Result<StoredPage> {
        Ok(StoredPage {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            depth: row.get(3)?,
            links: row.get(4)?,
            fetched_at: row.get(5)?,
        })
    }
}

impl Storage for SqliteStorage {
    fn insert_page(&mut self, record: &PageRecord) -> StorageResult<InsertOutcome> {
        let links = encode_links(&record.links)?;
        let fetched_at = record.fetched_at.to_rfc3339();

        let tx = self.conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO pages (url, title, depth, links, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record.url, record.title, record.depth, links, fetched_at],
        )?;
        tx.commit()?;

        Ok(if inserted == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }

    fn load_pages(&self) -> StorageResult<Vec<StoredPage>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM pages ORDER BY id", PAGE_COLUMNS))?;

        let pages = stmt
            .query_map([], Self::page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<StoredPage>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS))?;

        let page = stmt
            .query_row(params![url], Self::page_from_row)
            .optional()?;

        Ok(page)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn depth_breakdown(&self) -> StorageResult<BTreeMap<u32, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT depth, COUNT(*) FROM pages GROUP BY depth ORDER BY depth")?;

        let breakdown = stmt
            .query_map([], |row| {
                let depth: u32 = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((depth, count as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(breakdown)
    }

    fn fetch_window(&self) -> StorageResult<Option<(String, String)>> {
        let window: (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(fetched_at), MAX(fetched_at) FROM pages",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(match window {
            (Some(first), Some(last)) => Some((first, last)),
            _ => None,
        })
    }
}
