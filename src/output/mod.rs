//! Output module for crawl reports
//!
//! This module handles:
//! - Building crawl statistics from a live crawl or a persisted run
//! - Printing statistics as a per-domain table

pub mod stats;

pub use stats::{load_statistics, print_statistics, write_statistics, CrawlStatistics};
