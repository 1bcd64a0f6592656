//! HTTP fetcher implementation
//!
//! This module provides the default crawl strategy:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with retries on transport failures
//! - Manual redirect handling (the target becomes a new task)
//! - Content type and content length constraints
//! - HTML parsing of successful responses

use crate::config::{Config, FetcherConfig, UserAgentConfig};
use crate::crawler::{parse_html, CrawlTask, Crawler, Page};
use anyhow::Context;
use chrono::Utc;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::{Handle, Runtime};

/// Async runtime shared by the HTTP strategies of all workers
///
/// Worker threads are plain OS threads; each request blocks its worker on this
/// runtime.
pub struct FetchRuntime {
    handle: Handle,
    runtime: Option<Runtime>,
}

impl FetchRuntime {
    /// Starts a multi-threaded runtime with `io_threads` threads
    pub fn new(io_threads: usize) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(io_threads.max(1))
            .thread_name("fetch-io")
            .enable_all()
            .build()?;

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Runs `future` to completion on the runtime
    ///
    /// Must not be called from inside an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }
}

impl Drop for FetchRuntime {
    fn drop(&mut self) {
        // Dropping may happen on any thread, including one owned by another runtime
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are not followed: a 3xx response is reported with its target so
/// the target goes through scheduling like any other URL.
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `fetcher` - Timeouts
///
/// # Example
///
/// ```no_run
/// use ripple_frontier::config::{FetcherConfig, UserAgentConfig};
/// use ripple_frontier::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "RippleFrontier".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, &FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetcher: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_millis(fetcher.read_timeout))
        .connect_timeout(Duration::from_millis(fetcher.connect_timeout))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Default crawl strategy: download with reqwest, parse with scraper
pub struct HttpCrawler {
    client: Client,
    runtime: Arc<FetchRuntime>,
    config: FetcherConfig,
}

impl HttpCrawler {
    pub fn new(client: Client, runtime: Arc<FetchRuntime>, config: FetcherConfig) -> Self {
        Self {
            client,
            runtime,
            config,
        }
    }

    /// Sends the GET request, retrying transport failures
    async fn send(&self, url: &str) -> anyhow::Result<Response> {
        let tries = self.config.tries.max(1);
        let mut attempt = 1;

        loop {
            tracing::debug!("Downloading {} (try {}/{})", url, attempt, tries);
            match self.client.get(url).send().await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < tries => {
                    tracing::info!("Request to {} failed: {}", url, e);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("could not download {}", url));
                }
            }
        }
    }

    async fn download(&self, task: &mut CrawlTask) -> anyhow::Result<Option<Page>> {
        let page_url = task.parsed_url()?;
        let started = Instant::now();
        let response = self.send(page_url.as_str()).await?;
        let status = response.status();

        let mut page = Page::new(task.url.clone(), status.as_u16(), Duration::ZERO);
        page.content_type = header_value(&response, CONTENT_TYPE);

        if status.is_redirection() {
            page.redirect_url = header_value(&response, LOCATION)
                .and_then(|location| page_url.join(&location).ok())
                .map(|target| target.to_string());
            tracing::debug!("{} redirects to {:?}", task.url, page.redirect_url);
        }

        if status != StatusCode::OK {
            page.response_time = started.elapsed();
            task.downloaded_at = Some(Utc::now());
            return Ok(Some(page));
        }

        if !self.accepts(&task.url, &response, page.content_type.as_deref()) {
            return Ok(None);
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                // Status already arrived; report the body failure as a status
                tracing::info!("Reading body of {} failed: {}", task.url, e);
                page.response_code = if e.is_timeout() {
                    StatusCode::REQUEST_TIMEOUT.as_u16()
                } else {
                    StatusCode::SERVICE_UNAVAILABLE.as_u16()
                };
                page.response_time = started.elapsed();
                task.downloaded_at = Some(Utc::now());
                return Ok(Some(page));
            }
        };

        page.response_time = started.elapsed();
        task.downloaded_at = Some(Utc::now());

        if self.config.max_content_length > 0 && body.len() as u64 > self.config.max_content_length
        {
            tracing::info!("{} exceeded the content length limit", task.url);
            return Ok(None);
        }

        let parsed = parse_html(&String::from_utf8_lossy(&body), &page_url);
        page.title = parsed.title;
        page.links = Some(parsed.links);
        task.parsed_at = Some(Utc::now());

        Ok(Some(page))
    }

    /// Checks the declared content type and length against the constraints
    fn accepts(&self, url: &str, response: &Response, content_type: Option<&str>) -> bool {
        let Some(content_type) = content_type else {
            tracing::info!("{} has no content type, skipping", url);
            return false;
        };

        let allowed = self
            .config
            .allowed_content_types
            .iter()
            .any(|allowed| content_type.starts_with(allowed.as_str()));
        if !allowed {
            tracing::info!("{} content type ({}) is not allowed", url, content_type);
            return false;
        }

        let declared_length =
            header_value(response, CONTENT_LENGTH).and_then(|v| v.parse::<u64>().ok());
        if let (Some(length), true) = (declared_length, self.config.max_content_length > 0) {
            if length > self.config.max_content_length {
                tracing::info!("{} content length ({}) exceeded limit", url, length);
                return false;
            }
        }

        true
    }
}

/// Builds one [`HttpCrawler`] per configured worker
///
/// All crawlers share one client (and its connection pool) and one runtime.
pub fn http_crawlers(config: &Config) -> crate::Result<Vec<Box<dyn Crawler>>> {
    let workers = config.crawler.workers.max(1) as usize;
    let runtime = Arc::new(FetchRuntime::new(workers.min(4))?);
    let client = build_http_client(&config.user_agent, &config.fetcher)?;

    Ok((0..workers)
        .map(|_| {
            Box::new(HttpCrawler::new(
                client.clone(),
                Arc::clone(&runtime),
                config.fetcher.clone(),
            )) as Box<dyn Crawler>
        })
        .collect())
}

impl Crawler for HttpCrawler {
    fn crawl(&mut self, task: &mut CrawlTask) -> anyhow::Result<Option<Page>> {
        self.runtime.block_on(self.download(task))
    }
}

fn header_value(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
