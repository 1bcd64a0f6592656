//! Storage module for the frontier's scratch databases
//!
//! This module handles:
//! - The durable overflow queue used when the in-memory queue is full
//! - The seen-URL set that enforces at-most-once scheduling
//! - Snapshots of per-domain statistics
//!
//! Both stores are ephemeral. Opening a store wipes its directory first, so a
//! crawl never resumes from a previous run.

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_queue_schema, initialize_stats_schema};
pub use sqlite::{prepare_environment, SqliteOverflowStore, SqliteStatsStore};
pub use traits::{OverflowStore, StatsStore, StorageError, StorageResult};

use std::collections::BTreeMap;

/// Persisted statistics of one domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRecord {
    pub domain: String,
    pub scheduled: u64,
    pub downloaded: u64,
    pub parsed: u64,
    pub errors: u64,
    /// HTTP status code -> responses with that status
    pub http_errors: BTreeMap<u16, u64>,
}
