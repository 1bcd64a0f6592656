use crate::queue::QueueTask;
use crate::url::{domain_name, normalize_url};
use crate::{UrlError, UrlResult};
use ::url::Url;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A URL to crawl at a given link depth
///
/// Tasks are serialized to JSON when the task queue spills to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlTask {
    /// Absolute http(s) URL
    pub url: String,

    /// Lowercased host with a leading "www." stripped
    pub domain: String,

    /// Link depth from the seeds (seeds are level 0)
    pub level: u32,

    /// Concurrency group in the task queue; `None` is never limited
    pub sequence_key: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Set by the crawl strategy once the response arrived
    pub downloaded_at: Option<DateTime<Utc>>,

    /// Set by the crawl strategy once the content was parsed
    pub parsed_at: Option<DateTime<Utc>>,

    /// Caller data carried along redirects
    pub custom_data: Option<serde_json::Value>,
}

impl CrawlTask {
    /// Creates a task for `url` at `level`
    ///
    /// The URL is stored in normalized form, so the same page always maps to
    /// the same seen-URL key.
    ///
    /// # Errors
    ///
    /// Returns `UrlError` if the URL does not parse, is not http(s) or has no
    /// host.
    pub fn new(url: &str, level: u32) -> UrlResult<Self> {
        let normalized = normalize_url(url).map_err(|e| match e {
            UrlError::Parse(msg) => UrlError::Parse(format!("{}: {}", url, msg)),
            other => other,
        })?;
        Self::from_normalized(normalized, level)
    }

    /// Creates a task from an already parsed URL
    pub fn from_url(url: &Url, level: u32) -> UrlResult<Self> {
        Self::from_normalized(normalize_url(url.as_str())?, level)
    }

    fn from_normalized(url: Url, level: u32) -> UrlResult<Self> {
        let domain = domain_name(&url).ok_or(UrlError::MissingDomain)?;

        Ok(Self {
            url: url.to_string(),
            sequence_key: Some(domain.clone()),
            domain,
            level,
            created_at: Utc::now(),
            downloaded_at: None,
            parsed_at: None,
            custom_data: None,
        })
    }

    /// Task for a link found on this task's page, one level deeper
    pub fn child(&self, url: &str) -> UrlResult<Self> {
        Self::new(url, self.level + 1)
    }

    /// Task for the target of a redirect, at the same level
    ///
    /// The custom data is carried over.
    pub fn redirect(&self, url: &str) -> UrlResult<Self> {
        let mut task = Self::new(url, self.level)?;
        task.custom_data = self.custom_data.clone();
        Ok(task)
    }

    pub fn with_custom_data(mut self, data: serde_json::Value) -> Self {
        self.custom_data = Some(data);
        self
    }

    /// Removes the task from per-sequence concurrency limiting
    pub fn unthrottled(mut self) -> Self {
        self.sequence_key = None;
        self
    }

    /// Parses the task URL again
    pub fn parsed_url(&self) -> UrlResult<Url> {
        Url::parse(&self.url).map_err(|e| UrlError::Parse(format!("{}: {}", self.url, e)))
    }
}

impl QueueTask for CrawlTask {
    fn sequence_key(&self) -> Option<&str> {
        self.sequence_key.as_deref()
    }
}
