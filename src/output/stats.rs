//! Statistics reporting
//!
//! This module builds crawl statistics from the live statistics service or
//! from the records persisted by a previous run, and prints them.

use crate::state::{CrawlTotals, StatisticsService};
use crate::storage::{DomainRecord, StatsStore, StorageResult};
use std::io::{self, Write};

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// URLs in the seen set
    pub seen_urls: u64,

    /// Counters summed over all domains
    pub totals: CrawlTotals,

    /// Per-domain counters, ordered by domain
    pub domains: Vec<DomainRecord>,
}

impl CrawlStatistics {
    /// Snapshot of a running or finished crawl
    pub fn from_service(statistics: &StatisticsService) -> Self {
        Self {
            seen_urls: statistics.seen_count(),
            totals: statistics.totals(),
            domains: statistics.domain_records(),
        }
    }

    /// Builds statistics from persisted per-domain records
    pub fn from_records(seen_urls: u64, domains: Vec<DomainRecord>) -> Self {
        let totals = domains
            .iter()
            .fold(CrawlTotals::default(), |mut totals, record| {
                totals.domains += 1;
                totals.scheduled += record.scheduled;
                totals.downloaded += record.downloaded;
                totals.parsed += record.parsed;
                totals.errors += record.errors;
                totals
            });

        Self {
            seen_urls,
            totals,
            domains,
        }
    }
}

/// Loads the statistics persisted in a statistics store
///
/// # Arguments
///
/// * `store` - The store to query
pub fn load_statistics(store: &dyn StatsStore) -> StorageResult<CrawlStatistics> {
    let seen_urls = store.seen_count()?;
    let domains = store.load_domain_records()?;
    Ok(CrawlStatistics::from_records(seen_urls, domains))
}

/// Writes statistics in a human-readable layout
pub fn write_statistics<W: Write>(out: &mut W, stats: &CrawlStatistics) -> io::Result<()> {
    writeln!(out, "=== Crawl Statistics ===\n")?;

    writeln!(out, "Overview:")?;
    writeln!(out, "  URLs seen: {}", stats.seen_urls)?;
    writeln!(out, "  Domains: {}", stats.totals.domains)?;
    writeln!(out, "  Scheduled: {}", stats.totals.scheduled)?;
    writeln!(out, "  Downloaded: {}", stats.totals.downloaded)?;
    writeln!(out, "  Parsed: {}", stats.totals.parsed)?;
    writeln!(out, "  Errors: {}", stats.totals.errors)?;
    writeln!(out)?;

    if stats.domains.is_empty() {
        return Ok(());
    }

    let width = stats
        .domains
        .iter()
        .map(|d| d.domain.len())
        .max()
        .unwrap_or(0)
        .max("Domain".len());

    writeln!(out, "Domains:")?;
    writeln!(
        out,
        "  {:<width$}  {:>9}  {:>10}  {:>6}  {:>6}  HTTP errors",
        "Domain",
        "Scheduled",
        "Downloaded",
        "Parsed",
        "Errors",
        width = width
    )?;

    for record in &stats.domains {
        let histogram = record
            .http_errors
            .iter()
            .map(|(status, count)| format!("{}x{}", status, count))
            .collect::<Vec<_>>()
            .join(" ");

        writeln!(
            out,
            "  {:<width$}  {:>9}  {:>10}  {:>6}  {:>6}  {}",
            record.domain,
            record.scheduled,
            record.downloaded,
            record.parsed,
            record.errors,
            histogram,
            width = width
        )?;
    }
    writeln!(out)?;

    // Calculate success rate
    let finished = stats.totals.downloaded + stats.totals.errors;
    if finished > 0 {
        let success_rate = stats.totals.downloaded as f64 / finished as f64 * 100.0;
        writeln!(
            out,
            "Success Rate: {:.1}% ({} / {} responses below 400)",
            success_rate, stats.totals.downloaded, finished
        )?;
    }

    Ok(())
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = write_statistics(&mut out, stats) {
        tracing::warn!("Failed to print statistics: {}", e);
    }
}
