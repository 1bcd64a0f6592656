//! Scheduler for admitting new tasks into the task queue
//!
//! This module handles:
//! - At-most-once scheduling through the seen-URL set
//! - Optional spreading of consecutive same-domain tasks

use crate::crawler::CrawlTask;
use crate::queue::TaskQueue;
use crate::state::StatisticsService;
use parking_lot::Mutex;
use std::sync::Arc;

/// Gatekeeper between discovered URLs and the task queue
///
/// The scheduler does not check link depth; callers filter children by level
/// before scheduling them.
pub struct Scheduler {
    statistics: Arc<StatisticsService>,

    /// Push consecutive tasks of one domain through the low-priority path
    spread_domains: bool,

    /// Domain of the most recently scheduled task
    last_domain: Mutex<Option<String>>,
}

impl Scheduler {
    pub fn new(statistics: Arc<StatisticsService>, spread_domains: bool) -> Self {
        Self {
            statistics,
            spread_domains,
            last_domain: Mutex::new(None),
        }
    }

    /// Hands `task` to `queue` unless its URL was scheduled before
    ///
    /// # Returns
    ///
    /// `true` if the task was enqueued
    pub fn schedule(&self, task: CrawlTask, queue: &TaskQueue<CrawlTask>) -> bool {
        if !self.statistics.try_mark_scheduled(&task) {
            tracing::trace!("Already scheduled: {}", task.url);
            return false;
        }

        tracing::debug!("Scheduled {} (level {})", task.url, task.level);

        if self.spread_domains && self.repeats_last_domain(&task.domain) {
            queue.enqueue_deferred(task);
        } else {
            queue.enqueue(task);
        }
        true
    }

    /// Records `domain` as the latest one and reports whether it repeats
    fn repeats_last_domain(&self, domain: &str) -> bool {
        let mut last = self.last_domain.lock();
        if last.as_deref() == Some(domain) {
            true
        } else {
            *last = Some(domain.to_string());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{HybridQueue, TaskQueueOptions};
    use crate::state::DomainRegistry;
    use crate::storage::{SqliteOverflowStore, SqliteStatsStore};

    fn statistics() -> Arc<StatisticsService> {
        let store = SqliteStatsStore::in_memory().unwrap();
        Arc::new(StatisticsService::new(
            Box::new(store),
            Arc::new(DomainRegistry::new()),
        ))
    }

    fn overflow_queue() -> TaskQueue<CrawlTask> {
        let store = SqliteOverflowStore::<CrawlTask>::in_memory().unwrap();
        TaskQueue::new(
            HybridQueue::with_overflow(10, Box::new(store)),
            TaskQueueOptions::default(),
        )
    }

    fn task(url: &str) -> CrawlTask {
        CrawlTask::new(url, 0).unwrap()
    }

    #[test]
    fn test_schedule_once() {
        let scheduler = Scheduler::new(statistics(), false);
        let queue = overflow_queue();

        assert!(scheduler.schedule(task("https://example.com/"), &queue));
        assert!(!scheduler.schedule(task("https://example.com/"), &queue));
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_spread_domains_defers_repeats() {
        let scheduler = Scheduler::new(statistics(), true);
        let queue = overflow_queue();

        scheduler.schedule(task("https://a.com/1"), &queue);
        scheduler.schedule(task("https://a.com/2"), &queue);
        scheduler.schedule(task("https://b.com/1"), &queue);

        // a.com/2 went through the low-priority path and is served last
        let order: Vec<_> = std::iter::from_fn(|| queue.dequeue()).map(|t| t.url).collect();
        assert_eq!(
            order,
            vec!["https://a.com/1", "https://b.com/1", "https://a.com/2"]
        );
    }

    #[test]
    fn test_no_spreading_keeps_fifo() {
        let scheduler = Scheduler::new(statistics(), false);
        let queue = overflow_queue();

        scheduler.schedule(task("https://a.com/1"), &queue);
        scheduler.schedule(task("https://a.com/2"), &queue);
        scheduler.schedule(task("https://b.com/1"), &queue);

        let order: Vec<_> = std::iter::from_fn(|| queue.dequeue()).map(|t| t.url).collect();
        assert_eq!(
            order,
            vec!["https://a.com/1", "https://a.com/2", "https://b.com/1"]
        );
    }
}
