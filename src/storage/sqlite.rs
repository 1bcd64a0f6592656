//! SQLite storage implementation
//!
//! This module provides SQLite-backed implementations of the overflow queue
//! and the statistics store.

use crate::storage::schema::{initialize_queue_schema, initialize_stats_schema};
use crate::storage::traits::{OverflowStore, StatsStore, StorageResult};
use crate::storage::DomainRecord;
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::Path;

/// File name of the overflow queue database inside its directory
const QUEUE_DB_FILE: &str = "queue.db";

/// File name of the statistics database inside its directory
const STATS_DB_FILE: &str = "stats.db";

/// Wipes and recreates a store directory
///
/// Anything left from a previous run is removed; the frontier never resumes.
///
/// # Arguments
///
/// * `dir` - The directory that will hold the store's database file
pub fn prepare_environment(dir: &Path) -> StorageResult<()> {
    if dir.exists() {
        tracing::info!("Environment {} already exists, cleaning it", dir.display());
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Opens a file-backed connection with the crawl's pragmas applied
fn open_connection(path: &Path) -> StorageResult<Connection> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    Ok(conn)
}

/// SQLite overflow queue
///
/// Elements are stored as JSON in insertion order. Reading an element deletes
/// it.
pub struct SqliteOverflowStore<T> {
    conn: Connection,
    _element: PhantomData<fn() -> T>,
}

impl<T> SqliteOverflowStore<T> {
    /// Wipes `dir` and opens a fresh overflow database inside it
    pub fn open(dir: &Path) -> StorageResult<Self> {
        prepare_environment(dir)?;
        let conn = open_connection(&dir.join(QUEUE_DB_FILE))?;
        initialize_queue_schema(&conn)?;
        tracing::debug!("Overflow queue opened at {}", dir.display());
        Ok(Self::from_connection(conn))
    }

    /// Opens an in-memory overflow database
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_queue_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            _element: PhantomData,
        }
    }
}

impl<T> OverflowStore<T> for SqliteOverflowStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn push(&mut self, element: &T) -> StorageResult<i64> {
        let payload = serde_json::to_string(element)?;
        self.conn.execute(
            "INSERT INTO queue_elements (payload) VALUES (?1)",
            params![payload],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn pop_oldest(&mut self) -> StorageResult<Option<T>> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT sequence_id, payload FROM queue_elements ORDER BY sequence_id LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((sequence_id, payload)) = row else {
            return Ok(None);
        };

        // Delete before decoding so an unreadable record cannot wedge the queue
        self.conn.execute(
            "DELETE FROM queue_elements WHERE sequence_id = ?1",
            params![sequence_id],
        )?;

        Ok(Some(serde_json::from_str(&payload)?))
    }

    fn len(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM queue_elements", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// SQLite seen-URL set and statistics snapshot
pub struct SqliteStatsStore {
    conn: Connection,
}

impl SqliteStatsStore {
    /// Wipes `dir` and opens a fresh statistics database inside it
    pub fn open(dir: &Path) -> StorageResult<Self> {
        prepare_environment(dir)?;
        let conn = open_connection(&dir.join(STATS_DB_FILE))?;
        initialize_stats_schema(&conn)?;
        tracing::debug!("Statistics store opened at {}", dir.display());
        Ok(Self { conn })
    }

    /// Opens an in-memory statistics database
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_stats_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens the statistics left behind by a previous run
    ///
    /// Unlike [`SqliteStatsStore::open`], nothing is wiped and the database
    /// must already exist.
    pub fn inspect(dir: &Path) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(
            dir.join(STATS_DB_FILE),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }
}

impl StatsStore for SqliteStatsStore {
    fn contains(&self, url: &str) -> StorageResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM seen_urls WHERE url = ?1",
                params![url],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&mut self, url: &str, domain: &str) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO seen_urls (url, domain, scheduled_at) VALUES (?1, ?2, ?3)",
            params![url, domain, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    fn seen_count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seen_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn save_domain_records(&mut self, records: &[DomainRecord]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM domain_stats", [])?;
        tx.execute("DELETE FROM domain_http_errors", [])?;

        {
            let mut stats = tx.prepare(
                "INSERT INTO domain_stats (domain, scheduled, downloaded, parsed, errors, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            let mut histogram = tx.prepare(
                "INSERT INTO domain_http_errors (domain, status, count) VALUES (?1, ?2, ?3)",
            )?;

            for record in records {
                stats.execute(params![
                    record.domain,
                    record.scheduled as i64,
                    record.downloaded as i64,
                    record.parsed as i64,
                    record.errors as i64,
                    now,
                ])?;

                for (status, count) in &record.http_errors {
                    histogram.execute(params![record.domain, *status as i64, *count as i64])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load_domain_records(&self) -> StorageResult<Vec<DomainRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT domain, scheduled, downloaded, parsed, errors
             FROM domain_stats ORDER BY domain",
        )?;

        let mut records = stmt
            .query_map([], |row| {
                Ok(DomainRecord {
                    domain: row.get(0)?,
                    scheduled: row.get::<_, i64>(1)? as u64,
                    downloaded: row.get::<_, i64>(2)? as u64,
                    parsed: row.get::<_, i64>(3)? as u64,
                    errors: row.get::<_, i64>(4)? as u64,
                    http_errors: Default::default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT domain, status, count FROM domain_http_errors")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)? as u16,
                row.get::<_, i64>(2)? as u64,
            ))
        })?;

        for row in rows {
            let (domain, status, count) = row?;
            if let Some(record) = records.iter_mut().find(|r| r.domain == domain) {
                record.http_errors.insert(status, count);
            }
        }

        Ok(records)
    }
}
