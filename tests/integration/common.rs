//! Shared fixtures: configuration, a scripted site and controller helpers

use parking_lot::Mutex;
use ripple_frontier::config::{parse_config, Config};
use ripple_frontier::storage::{SqliteOverflowStore, SqliteStatsStore};
use ripple_frontier::{CrawlController, CrawlTask, Crawler, Page};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const IDLE_POLL: Duration = Duration::from_millis(5);
pub const IDLE_WAIT: Option<Duration> = Some(Duration::from_secs(15));

const BASE_CONFIG: &str = r#"
[crawler]
workers = 2
politeness-period = 0
defer-timeout = 10
poll-interval = 2
stop-timeout = 2000

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[storage]
queue-dir = "./test-data/queue"
stats-dir = "./test-data/stats"
queue-capacity = 10
"#;

/// Configuration with politeness disabled and short timeouts
pub fn test_config(seeds: &[&str]) -> Config {
    let mut config = parse_config(BASE_CONFIG).expect("base config is valid");
    config.crawler.seeds = seeds.iter().map(|s| s.to_string()).collect();
    config
}

/// What the scripted site answers for a URL
#[derive(Debug, Clone)]
pub enum Reply {
    Html(Vec<String>),
    Redirect(String),
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct Visit {
    pub url: String,
    pub level: u32,
    pub custom_data: Option<serde_json::Value>,
    pub at: Instant,
}

/// In-memory site shared by all workers of a test
///
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct Site {
    replies: HashMap<String, Reply>,
    delay: Duration,
    visits: Mutex<Vec<Visit>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, links: &[&str]) -> Self {
        let links = links.iter().map(|l| l.to_string()).collect();
        self.replies.insert(url.to_string(), Reply::Html(links));
        self
    }

    pub fn redirect(mut self, url: &str, target: &str) -> Self {
        self.replies
            .insert(url.to_string(), Reply::Redirect(target.to_string()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.replies.insert(url.to_string(), Reply::Status(status));
        self
    }

    /// Time each request takes
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn visits(&self) -> Vec<Visit> {
        self.visits.lock().clone()
    }

    pub fn visit_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for visit in self.visits.lock().iter() {
            *counts.entry(visit.url.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Highest number of requests that were running at once
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Crawl strategy answering from a [`Site`]
pub struct SiteCrawler {
    site: Arc<Site>,
}

impl Crawler for SiteCrawler {
    fn crawl(&mut self, task: &mut CrawlTask) -> anyhow::Result<Option<Page>> {
        let active = self.site.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.site.max_active.fetch_max(active, Ordering::SeqCst);

        self.site.visits.lock().push(Visit {
            url: task.url.clone(),
            level: task.level,
            custom_data: task.custom_data.clone(),
            at: Instant::now(),
        });

        if !self.site.delay.is_zero() {
            thread::sleep(self.site.delay);
        }

        let page = match self.site.replies.get(&task.url) {
            Some(Reply::Html(links)) => {
                Page::new(task.url.clone(), 200, self.site.delay).with_links(links.clone())
            }
            Some(Reply::Redirect(target)) => {
                if task.custom_data.is_none() {
                    task.custom_data = Some(json!({ "redirected_from": task.url }));
                }
                Page::new(task.url.clone(), 301, self.site.delay).with_redirect(target.clone())
            }
            Some(Reply::Status(status)) => Page::new(task.url.clone(), *status, self.site.delay),
            None => Page::new(task.url.clone(), 404, self.site.delay),
        };

        self.site.active.fetch_sub(1, Ordering::SeqCst);
        Ok(Some(page))
    }
}

/// One [`SiteCrawler`] per configured worker
pub fn site_crawlers(site: &Arc<Site>, config: &Config) -> Vec<Box<dyn Crawler>> {
    (0..config.crawler.workers)
        .map(|_| {
            Box::new(SiteCrawler {
                site: Arc::clone(site),
            }) as Box<dyn Crawler>
        })
        .collect()
}

/// Controller over in-memory stores
pub fn controller(config: Config, crawlers: Vec<Box<dyn Crawler>>) -> CrawlController {
    CrawlController::with_stores(
        config,
        crawlers,
        Box::new(SqliteOverflowStore::<CrawlTask>::in_memory().expect("overflow store")),
        Box::new(SqliteStatsStore::in_memory().expect("stats store")),
    )
    .expect("controller")
}

/// Starts the crawl and waits until it runs out of tasks
pub fn crawl_to_completion(controller: &CrawlController) {
    controller.start().expect("crawl starts");
    assert!(
        controller.wait_until_idle(IDLE_POLL, IDLE_WAIT),
        "crawl did not finish, {} tasks left",
        controller.tasks_count()
    );
    assert!(controller.stop());
}
