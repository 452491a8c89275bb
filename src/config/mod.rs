//! Configuration module for Depthcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Command-line values are merged on top by the binary before
//! [`validate`] runs.
//!
//! # Example
//!
//! ```no_run
//! use depthcrawl::config::load_validated_config;
//! use std::path::Path;
//!
//! let config = load_validated_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, RenderConfig, DEFAULT_DATABASE_PATH,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS,
};

// Re-export parser and validation functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_validated_config, parse_config,
};
pub use validation::{validate, MAX_WORKERS};
