//! Ripple-Frontier: a polite, concurrent crawl frontier
//!
//! This crate schedules crawl work across a pool of worker threads. It keeps a
//! bounded in-memory queue that spills to SQLite under load, defers tasks that
//! cannot run yet, enforces per-domain politeness, parallelism and error limits,
//! and guarantees every discovered URL is scheduled at most once.

pub mod config;
pub mod crawler;
pub mod output;
pub mod queue;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Ripple-Frontier operations
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Task queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No seeds were added before starting the crawl")]
    NoSeeds,

    #[error("At least one crawl strategy is required")]
    NoWorkers,

    #[error("The crawl was stopped and cannot be restarted")]
    Stopped,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Ripple-Frontier operations
pub type Result<T> = std::result::Result<T, FrontierError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlController, CrawlTask, Crawler, Page};
pub use queue::{HybridQueue, QueueTask, TaskQueue};
pub use state::{DomainState, StatisticsService};
pub use url::{domain_name, extract_domain, normalize_url};
