//! Database schema definitions
//!
//! The overflow queue and the statistics store live in separate database
//! files, each in its own scratch directory.

/// Schema of the overflow queue database
pub const QUEUE_SCHEMA_SQL: &str = r#"
-- Tasks spilled from the in-memory queue, oldest id first
CREATE TABLE IF NOT EXISTS queue_elements (
    sequence_id INTEGER PRIMARY KEY AUTOINCREMENT,
    payload TEXT NOT NULL
);
"#;

/// Schema of the seen-URL and statistics database
pub const STATS_SCHEMA_SQL: &str = r#"
-- Every URL ever accepted by the scheduler
CREATE TABLE IF NOT EXISTS seen_urls (
    url TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    scheduled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_seen_urls_domain ON seen_urls(domain);

-- Per-domain counters, snapshotted periodically during the crawl
CREATE TABLE IF NOT EXISTS domain_stats (
    domain TEXT PRIMARY KEY,
    scheduled INTEGER NOT NULL DEFAULT 0,
    downloaded INTEGER NOT NULL DEFAULT 0,
    parsed INTEGER NOT NULL DEFAULT 0,
    errors INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Per-domain HTTP error histogram
CREATE TABLE IF NOT EXISTS domain_http_errors (
    domain TEXT NOT NULL,
    status INTEGER NOT NULL,
    count INTEGER NOT NULL,
    PRIMARY KEY (domain, status)
);
"#;

/// Creates the overflow queue tables
pub fn initialize_queue_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(QUEUE_SCHEMA_SQL)
}

/// Creates the statistics tables
pub fn initialize_stats_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(STATS_SCHEMA_SQL)
}
