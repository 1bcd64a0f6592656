use serde::Deserialize;

/// Main configuration structure for Ripple-Frontier
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub storage: StorageConfig,
    #[serde(rename = "http-error-limit", default)]
    pub http_error_limits: Vec<HttpErrorLimit>,
    #[serde(rename = "domain", default)]
    pub domains: Vec<DomainConstraints>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of worker threads (one crawl strategy each)
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Maximum link depth from the seeds (0 = unlimited)
    #[serde(rename = "max-level", default)]
    pub max_level: u32,

    /// Maximum concurrent requests per domain (0 = unlimited)
    #[serde(rename = "max-parallel-requests", default = "default_max_parallel_requests")]
    pub max_parallel_requests: u32,

    /// Minimum time between two dispatches to the same domain (milliseconds, 0 = disabled)
    #[serde(rename = "politeness-period", default = "default_politeness_period")]
    pub politeness_period: u64,

    /// Delay before a task denied by politeness or parallelism is retried (milliseconds)
    #[serde(rename = "defer-timeout", default = "default_defer_timeout")]
    pub defer_timeout: u64,

    /// Maximum in-flight tasks per sequence key in the task queue (0 = unlimited)
    #[serde(rename = "max-parallel-sequences", default)]
    pub max_parallel_sequences: u32,

    /// Route consecutive same-domain tasks through the low-priority path
    #[serde(rename = "spread-domains", default)]
    pub spread_domains: bool,

    /// Longest idle wait of a worker before it polls the queue again (milliseconds)
    #[serde(rename = "poll-interval", default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Grace period granted to workers on shutdown (milliseconds)
    #[serde(rename = "stop-timeout", default = "default_stop_timeout")]
    pub stop_timeout: u64,

    /// URLs the crawl starts from, at level 0
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Settings of the default HTTP crawl strategy
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Connection timeout (milliseconds)
    #[serde(rename = "connect-timeout", default = "default_http_timeout")]
    pub connect_timeout: u64,

    /// Whole-request timeout (milliseconds)
    #[serde(rename = "read-timeout", default = "default_http_timeout")]
    pub read_timeout: u64,

    /// Attempts per URL on network failures
    #[serde(default = "default_tries")]
    pub tries: u32,

    /// Largest accepted body in bytes (0 = unlimited)
    #[serde(rename = "max-content-length", default)]
    pub max_content_length: u64,

    /// Content types that are downloaded and parsed
    #[serde(rename = "allowed-content-types", default = "default_content_types")]
    pub allowed_content_types: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_http_timeout(),
            read_timeout: default_http_timeout(),
            tries: default_tries(),
            max_content_length: 0,
            allowed_content_types: default_content_types(),
        }
    }
}

/// Scratch storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory of the overflow queue database (wiped on startup)
    #[serde(rename = "queue-dir")]
    pub queue_dir: String,

    /// Directory of the seen-URL and statistics database (wiped on startup)
    #[serde(rename = "stats-dir")]
    pub stats_dir: String,

    /// Tasks held in memory before the queue spills to disk
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Circuit breaker threshold for one HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HttpErrorLimit {
    /// HTTP status code being counted
    pub status: u16,

    /// Responses with this status after which the domain is abandoned
    pub limit: u64,
}

/// Per-domain overrides of the global crawl limits
///
/// Each field falls back to the global value when absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainConstraints {
    /// Domain name or wildcard pattern (e.g., "*.example.com")
    pub name: String,

    #[serde(rename = "max-level")]
    pub max_level: Option<u32>,

    #[serde(rename = "max-parallel-requests")]
    pub max_parallel_requests: Option<u32>,

    /// Milliseconds
    #[serde(rename = "politeness-period")]
    pub politeness_period: Option<u64>,
}

fn default_workers() -> u32 {
    4
}

fn default_max_parallel_requests() -> u32 {
    1
}

fn default_politeness_period() -> u64 {
    1000
}

fn default_defer_timeout() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    10
}

fn default_stop_timeout() -> u64 {
    10_000
}

fn default_http_timeout() -> u64 {
    30_000
}

fn default_tries() -> u32 {
    1
}

fn default_content_types() -> Vec<String> {
    vec!["text/html".to_string()]
}

fn default_queue_capacity() -> usize {
    100
}
