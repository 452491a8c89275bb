//! Output module for reporting on a storage target
//!
//! Everything here is read-only: statistics are computed from the `pages`
//! table and printed for the `--stats` mode.

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
