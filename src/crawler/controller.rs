//! Crawl controller - wires the frontier together and drives the workers
//!
//! This module contains:
//! - [`CrawlController`]: builds stores, statistics, admission control, the
//!   task queue and the scheduler, and owns the crawl lifecycle
//! - [`CrawlWorker`]: the per-thread task handler that runs admission
//!   control, the crawl strategy and result processing

use crate::config::Config;
use crate::crawler::{AdmissionController, CrawlTask, Crawler, Page, Scheduler};
use crate::queue::{HybridQueue, TaskHandler, TaskQueue, TaskQueueOptions};
use crate::state::{DomainRegistry, StatisticsService};
use crate::storage::{OverflowStore, SqliteOverflowStore, SqliteStatsStore, StatsStore};
use crate::{FrontierError, Result};
use anyhow::Context;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Stopped,
}

struct Lifecycle {
    phase: Phase,
    /// Seeds added before the crawl started
    seeds: Vec<CrawlTask>,
}

/// Main crawl controller
pub struct CrawlController {
    config: Arc<Config>,
    queue: Arc<TaskQueue<CrawlTask>>,
    scheduler: Arc<Scheduler>,
    statistics: Arc<StatisticsService>,
    lifecycle: Mutex<Lifecycle>,
}

impl CrawlController {
    /// Creates a controller backed by SQLite stores
    ///
    /// The queue and statistics directories from the configuration are wiped
    /// and recreated. One worker thread is started per crawl strategy.
    ///
    /// # Errors
    ///
    /// * `FrontierError::NoWorkers` - `crawlers` is empty
    /// * `FrontierError::Storage` - A store could not be created
    /// * `FrontierError::Url` - A configured seed is not a valid URL
    pub fn open(config: Config, crawlers: Vec<Box<dyn Crawler>>) -> Result<Self> {
        if crawlers.is_empty() {
            return Err(FrontierError::NoWorkers);
        }

        let overflow =
            SqliteOverflowStore::<CrawlTask>::open(Path::new(&config.storage.queue_dir))?;
        let stats = SqliteStatsStore::open(Path::new(&config.storage.stats_dir))?;

        Self::with_stores(config, crawlers, Box::new(overflow), Box::new(stats))
    }

    /// Creates a controller over caller-provided stores
    pub fn with_stores(
        config: Config,
        crawlers: Vec<Box<dyn Crawler>>,
        overflow: Box<dyn OverflowStore<CrawlTask>>,
        stats: Box<dyn StatsStore>,
    ) -> Result<Self> {
        if crawlers.is_empty() {
            return Err(FrontierError::NoWorkers);
        }

        let config = Arc::new(config);
        let registry = Arc::new(DomainRegistry::new());
        let statistics = Arc::new(StatisticsService::new(stats, Arc::clone(&registry)));
        let admission = Arc::new(AdmissionController::new(registry, Arc::clone(&config)));
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&statistics),
            config.crawler.spread_domains,
        ));

        let options = TaskQueueOptions {
            max_parallel_sequences: config.crawler.max_parallel_sequences as usize,
            poll_interval: Duration::from_millis(config.crawler.poll_interval),
            stop_timeout: Duration::from_millis(config.crawler.stop_timeout),
            ..Default::default()
        };
        let queue = Arc::new(TaskQueue::new(
            HybridQueue::with_overflow(config.storage.queue_capacity, overflow),
            options,
        ));

        let workers = crawlers.len();
        for crawler in crawlers {
            queue.add_worker(Box::new(CrawlWorker {
                crawler,
                config: Arc::clone(&config),
                admission: Arc::clone(&admission),
                scheduler: Arc::clone(&scheduler),
                statistics: Arc::clone(&statistics),
            }))?;
        }

        let controller = Self {
            config: Arc::clone(&config),
            queue,
            scheduler,
            statistics,
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Idle,
                seeds: Vec::new(),
            }),
        };

        for seed in &config.crawler.seeds {
            controller.add_seed(seed)?;
        }

        tracing::info!("Crawl controller ready with {} workers", workers);
        Ok(controller)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &Arc<TaskQueue<CrawlTask>> {
        &self.queue
    }

    pub fn statistics(&self) -> &Arc<StatisticsService> {
        &self.statistics
    }

    /// Adds a level 0 task
    ///
    /// Before [`CrawlController::start`] the seed is held back; afterwards it
    /// is scheduled right away.
    pub fn add_seed(&self, url: &str) -> Result<()> {
        let task = CrawlTask::new(url, 0)?;

        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.phase {
            Phase::Idle => {
                tracing::debug!("Added seed {}", task.url);
                lifecycle.seeds.push(task);
            }
            Phase::Running => {
                drop(lifecycle);
                self.scheduler.schedule(task, &self.queue);
            }
            Phase::Stopped => return Err(FrontierError::Stopped),
        }
        Ok(())
    }

    /// Schedules the seeds and starts the worker threads
    ///
    /// Calling `start` on a running crawl does nothing.
    ///
    /// # Errors
    ///
    /// * `FrontierError::NoSeeds` - Nothing to crawl
    /// * `FrontierError::Stopped` - The crawl was already stopped
    /// * `FrontierError::Queue` - Worker threads could not be spawned
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();

        match lifecycle.phase {
            Phase::Running => {
                tracing::debug!("Crawl is already running");
                return Ok(());
            }
            Phase::Stopped => return Err(FrontierError::Stopped),
            Phase::Idle => {}
        }

        if lifecycle.seeds.is_empty() && self.queue.size() == 0 {
            return Err(FrontierError::NoSeeds);
        }

        tracing::info!("Starting crawl");

        let seeds = std::mem::take(&mut lifecycle.seeds);
        let total = seeds.len();
        let scheduled = seeds
            .into_iter()
            .map(|seed| self.scheduler.schedule(seed, &self.queue))
            .filter(|accepted| *accepted)
            .count();
        tracing::info!("Scheduled {} of {} seeds", scheduled, total);

        self.queue.start()?;
        lifecycle.phase = Phase::Running;
        Ok(())
    }

    /// Stops the worker threads
    ///
    /// Running tasks finish; queued tasks are abandoned. Returns `true` if all
    /// workers exited within the configured stop timeout.
    pub fn stop(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.phase != Phase::Running {
            return true;
        }

        tracing::info!("Stopping crawl");
        lifecycle.phase = Phase::Stopped;
        drop(lifecycle);

        self.queue.stop()
    }

    /// Waits for the worker threads to exit (see [`TaskQueue::join`])
    pub fn join(&self, timeout: Option<Duration>) -> bool {
        self.queue.join(timeout)
    }

    /// Queued, deferred and running tasks
    pub fn tasks_count(&self) -> usize {
        self.queue.size()
    }

    /// Polls until no task is left or `max_wait` elapses
    ///
    /// # Returns
    ///
    /// `true` if the crawl ran out of tasks
    pub fn wait_until_idle(&self, poll: Duration, max_wait: Option<Duration>) -> bool {
        let deadline = max_wait.map(|wait| Instant::now() + wait);

        loop {
            if self.tasks_count() == 0 {
                return true;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return false;
            }
            thread::sleep(poll);
        }
    }

    /// Writes the per-domain statistics to the statistics store
    pub fn persist_statistics(&self) -> Result<()> {
        self.statistics.persist()?;
        Ok(())
    }
}

impl Drop for CrawlController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Task handler run by every worker thread
pub struct CrawlWorker {
    crawler: Box<dyn Crawler>,
    config: Arc<Config>,
    admission: Arc<AdmissionController>,
    scheduler: Arc<Scheduler>,
    statistics: Arc<StatisticsService>,
}

impl CrawlWorker {
    /// Updates statistics and schedules follow-up tasks for a crawled page
    fn process_page(&self, task: &CrawlTask, page: &Page, queue: &TaskQueue<CrawlTask>) {
        self.statistics.after_downloading(task, page);

        if page.is_success() {
            self.statistics.after_parsing(task);
            self.schedule_links(task, page, queue);
        } else if let Some(target) = page.redirect_target() {
            self.schedule_redirect(task, target, queue);
        } else {
            tracing::debug!("{} answered {}", task.url, page.response_code);
        }
    }

    fn schedule_links(&self, task: &CrawlTask, page: &Page, queue: &TaskQueue<CrawlTask>) {
        let Some(links) = page.links.as_ref() else {
            return;
        };

        // All children share one level
        if !self
            .config
            .limits_for(&task.domain)
            .allows_level(task.level + 1)
        {
            tracing::debug!("{} is at the depth limit, not following links", task.url);
            return;
        }

        let mut scheduled = 0usize;
        for link in links {
            let child = match task.child(link) {
                Ok(child) => child,
                Err(e) => {
                    tracing::trace!("Skipping link {}: {}", link, e);
                    continue;
                }
            };

            if self.crawler.should_crawl(&child, task) && self.scheduler.schedule(child, queue) {
                scheduled += 1;
            }
        }

        tracing::debug!(
            "Scheduled {} of {} links found on {}",
            scheduled,
            links.len(),
            task.url
        );
    }

    fn schedule_redirect(&self, task: &CrawlTask, target: &str, queue: &TaskQueue<CrawlTask>) {
        let redirect = match task.redirect(target) {
            Ok(redirect) => redirect,
            Err(e) => {
                tracing::debug!("Ignoring redirect from {} to {}: {}", task.url, target, e);
                return;
            }
        };

        if self.crawler.should_crawl(&redirect, task) && self.scheduler.schedule(redirect, queue) {
            tracing::debug!("Scheduled redirect from {} to {}", task.url, target);
        }
    }
}

impl TaskHandler<CrawlTask> for CrawlWorker {
    fn handle(&mut self, mut task: CrawlTask, queue: &TaskQueue<CrawlTask>) -> anyhow::Result<()> {
        let permit = match self.admission.try_dispatch(&task.domain) {
            Ok(permit) => permit,
            Err(denial) if denial.is_permanent() => {
                tracing::warn!("Dropping {}: {}", task.url, denial);
                return Ok(());
            }
            Err(denial) => {
                tracing::debug!("Deferring {}: {}", task.url, denial);
                queue.defer(task, self.config.defer_timeout());
                return Ok(());
            }
        };

        self.crawler.before_crawl(&task);
        let outcome = self.crawler.crawl(&mut task);
        drop(permit);

        let page = match outcome {
            Ok(page) => page,
            Err(e) => {
                self.crawler.after_crawl(&task, None);
                return Err(e).with_context(|| format!("crawling {} failed", task.url));
            }
        };
        self.crawler.after_crawl(&task, page.as_ref());

        match page {
            Some(page) => self.process_page(&task, &page, queue),
            None => tracing::debug!("{} was not downloaded", task.url),
        }
        Ok(())
    }
}
