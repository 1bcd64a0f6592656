//! Configuration module for Ripple-Frontier
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving the effective limits of each domain.
//!
//! # Example
//!
//! ```no_run
//! use ripple_frontier::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("frontier.toml")).unwrap();
//! println!("Workers: {}", config.crawler.workers);
//! ```

mod constraints;
mod parser;
mod types;
mod validation;

pub use constraints::DomainLimits;
pub use types::{
    Config, CrawlerConfig, DomainConstraints, FetcherConfig, HttpErrorLimit, StorageConfig,
    UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;

/// Configuration shared by unit tests across the crate
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 2,
            max_level: 3,
            max_parallel_requests: 2,
            politeness_period: 100,
            defer_timeout: 20,
            max_parallel_sequences: 0,
            spread_domains: false,
            poll_interval: 5,
            stop_timeout: 2000,
            seeds: vec!["https://example.com/".to_string()],
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        },
        fetcher: FetcherConfig::default(),
        storage: StorageConfig {
            queue_dir: "./test-data/queue".to_string(),
            stats_dir: "./test-data/stats".to_string(),
            queue_capacity: 10,
        },
        http_error_limits: vec![HttpErrorLimit {
            status: 404,
            limit: 3,
        }],
        domains: Vec::new(),
    }
}
