//! Encoding for the `links` column
//!
//! Links are stored as newline-delimited absolute URLs in extraction order.
//! Normalized URLs cannot contain a line break (the `url` crate strips
//! ASCII tab and newline while parsing), so no escaping is needed.

use crate::storage::{StorageError, StorageResult};
use std::collections::HashSet;

/// Encodes an ordered link list for storage
///
/// Fails if a link contains a line break, which would corrupt the column.
pub fn encode_links<S: AsRef<str>>(links: &[S]) -> StorageResult<String> {
    let mut encoded = String::new();
    for (i, link) in links.iter().enumerate() {
        let link = link.as_ref();
        if link.contains(['\n', '\r']) {
            return Err(StorageError::Serialization(format!(
                "link contains a line break: {:?}",
                link
            )));
        }
        if i > 0 {
            encoded.push('\n');
        }
        encoded.push_str(link);
    }
    Ok(encoded)
}

/// Decodes a stored link list
///
/// Returns links in stored order with blank lines and repeats removed, so
/// iteration order is the first-occurrence order.
pub fn decode_links(encoded: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    encoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}
