use crate::crawler::{CrawlTask, Page};
use crate::state::{DomainRegistry, DomainState};
use crate::storage::{DomainRecord, StatsStore, StorageResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Crawl-wide counters summed over all domains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlTotals {
    pub domains: usize,
    pub scheduled: u64,
    pub downloaded: u64,
    pub parsed: u64,
    pub errors: u64,
}

/// Seen-URL bookkeeping and per-domain counters
///
/// The seen-URL set lives in a [`StatsStore`]; the counters live in the shared
/// [`DomainRegistry`] that the admission controller also reads.
pub struct StatisticsService {
    store: Mutex<Box<dyn StatsStore>>,
    registry: Arc<DomainRegistry>,
}

impl StatisticsService {
    pub fn new(store: Box<dyn StatsStore>, registry: Arc<DomainRegistry>) -> Self {
        Self {
            store: Mutex::new(store),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<DomainRegistry> {
        &self.registry
    }

    /// Returns true if `url` was already scheduled
    ///
    /// A storage failure is logged and reported as not crawled.
    pub fn is_crawled(&self, url: &str) -> bool {
        match self.store.lock().contains(url) {
            Ok(seen) => seen,
            Err(e) => {
                tracing::warn!("Seen-URL lookup failed for {}: {}", url, e);
                false
            }
        }
    }

    /// Marks the task's URL as scheduled unless it was seen before
    ///
    /// Check and insert happen under one lock, so concurrent callers with the
    /// same URL get exactly one `true`. A storage failure on insert is logged
    /// and the task is treated as new.
    pub fn try_mark_scheduled(&self, task: &CrawlTask) -> bool {
        let mut store = self.store.lock();

        let is_new = match store.insert(&task.url, &task.domain) {
            Ok(inserted) => inserted,
            Err(e) => {
                tracing::warn!("Failed to record {} as scheduled: {}", task.url, e);
                true
            }
        };

        if is_new {
            self.registry
                .update(&task.domain, DomainState::record_scheduled);
        }
        is_new
    }

    /// Records the response received for a task
    pub fn after_downloading(&self, task: &CrawlTask, page: &Page) {
        let now = Instant::now();
        self.registry.update(&task.domain, |state| {
            state.record_download(page.response_code, now)
        });
    }

    pub fn after_parsing(&self, task: &CrawlTask) {
        self.registry.update(&task.domain, DomainState::record_parsed);
    }

    /// Snapshot of one domain; an untouched domain yields empty counters
    pub fn domain_statistics(&self, domain: &str) -> DomainState {
        self.registry
            .snapshot(domain)
            .unwrap_or_else(|| DomainState::new(domain))
    }

    pub fn totals(&self) -> CrawlTotals {
        self.registry
            .snapshot_all()
            .iter()
            .fold(CrawlTotals::default(), |mut totals, state| {
                totals.domains += 1;
                totals.scheduled += state.scheduled;
                totals.downloaded += state.downloaded;
                totals.parsed += state.parsed;
                totals.errors += state.errors;
                totals
            })
    }

    /// Per-domain counters, ordered by domain
    pub fn domain_records(&self) -> Vec<DomainRecord> {
        self.registry
            .snapshot_all()
            .iter()
            .map(DomainState::to_record)
            .collect()
    }

    /// Number of URLs in the seen set (0 if the store cannot be read)
    pub fn seen_count(&self) -> u64 {
        self.store.lock().seen_count().unwrap_or_else(|e| {
            tracing::warn!("Failed to count seen URLs: {}", e);
            0
        })
    }

    /// Writes the current per-domain counters to the store
    pub fn persist(&self) -> StorageResult<()> {
        let records = self.domain_records();
        self.store.lock().save_domain_records(&records)?;
        tracing::debug!("Persisted statistics of {} domains", records.len());
        Ok(())
    }
}
