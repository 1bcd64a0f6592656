//! Pluggable crawl strategy

use crate::crawler::{CrawlTask, Page};

/// Downloads and parses pages for one worker
///
/// Every worker thread owns one strategy, so implementations may keep
/// per-thread state such as buffers or counters.
pub trait Crawler: Send {
    /// Crawls the task's URL
    ///
    /// Returns `Ok(None)` when nothing was downloaded (for example a content
    /// type that is not accepted). Errors are logged by the worker and the task
    /// is dropped.
    fn crawl(&mut self, task: &mut CrawlTask) -> anyhow::Result<Option<Page>>;

    /// Decides whether a discovered task should be scheduled
    ///
    /// Defaults to staying on the parent's domain.
    fn should_crawl(&self, candidate: &CrawlTask, parent: &CrawlTask) -> bool {
        same_domain(candidate, parent)
    }

    /// Called right before [`Crawler::crawl`]
    fn before_crawl(&mut self, _task: &CrawlTask) {}

    /// Called after [`Crawler::crawl`] with its page, if any
    fn after_crawl(&mut self, _task: &CrawlTask, _page: Option<&Page>) {}
}

/// Returns true if both tasks are on the same domain ("www." ignored)
pub fn same_domain(candidate: &CrawlTask, parent: &CrawlTask) -> bool {
    candidate.domain == parent.domain
}
