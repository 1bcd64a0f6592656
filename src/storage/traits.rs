//! Storage traits and error types
//!
//! Two independent stores back the frontier: an append-only overflow queue
//! keyed by a monotonically increasing sequence id, and the seen-URL set with
//! the per-domain statistics, keyed by URL string.

use crate::storage::DomainRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable FIFO used by the hybrid queue when memory is full
pub trait OverflowStore<T>: Send {
    /// Appends an element and returns its sequence id
    ///
    /// Ids start at 1 and are never reused within a run.
    fn push(&mut self, element: &T) -> StorageResult<i64>;

    /// Removes and returns the element with the lowest sequence id
    fn pop_oldest(&mut self) -> StorageResult<Option<T>>;

    /// Number of stored elements
    fn len(&self) -> StorageResult<usize>;

    /// Returns true if no element is stored
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Seen-URL set plus persisted per-domain statistics
pub trait StatsStore: Send {
    /// Returns true if `url` was ever inserted
    fn contains(&self, url: &str) -> StorageResult<bool>;

    /// Inserts `url`, returning false if it was already present
    fn insert(&mut self, url: &str, domain: &str) -> StorageResult<bool>;

    /// Number of URLs in the set
    fn seen_count(&self) -> StorageResult<u64>;

    /// Replaces the persisted per-domain statistics
    fn save_domain_records(&mut self, records: &[DomainRecord]) -> StorageResult<()>;

    /// Loads the persisted per-domain statistics, ordered by domain
    fn load_domain_records(&self) -> StorageResult<Vec<DomainRecord>>;
}
