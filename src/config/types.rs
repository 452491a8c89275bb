use serde::Deserialize;

/// Default number of concurrent workers
pub const DEFAULT_WORKERS: u32 = 10;

/// Default capacity of the persistence queue
pub const DEFAULT_QUEUE_CAPACITY: u32 = 256;

/// Default database file when none is configured
pub const DEFAULT_DATABASE_PATH: &str = "scraper.db";

/// Main configuration structure for Depthcrawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// URL the crawl starts from (depth 0)
    #[serde(default)]
    pub seed_url: String,

    /// Maximum link depth to crawl from the seed
    #[serde(default)]
    pub max_depth: u32,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Capacity of the record queue between workers and the writer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: u32,

    /// Only follow links on the seed's host
    #[serde(default)]
    pub same_domain_only: bool,

    /// Extra attempts for a fetch that failed with a retryable error
    #[serde(default)]
    pub fetch_retries: u32,

    /// Delay between fetch attempts (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Render backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RenderConfig {
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Fixed per-call timeout for loading a page (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file (the storage target)
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_url: String::new(),
            max_depth: 0,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            same_domain_only: false,
            fetch_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_workers() -> u32 {
    DEFAULT_WORKERS
}

fn default_queue_capacity() -> u32 {
    DEFAULT_QUEUE_CAPACITY
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    format!("depthcrawl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}
