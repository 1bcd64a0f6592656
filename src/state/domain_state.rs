use crate::config::HttpErrorLimit;
use crate::storage::DomainRecord;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tracks the state of a domain during crawling
///
/// This structure holds the counters reported in the statistics, the
/// timestamps used for politeness, the HTTP error histogram consulted by the
/// error breaker, and the number of requests currently running.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Domain this state belongs to (lowercased, "www." stripped)
    pub domain_name: String,

    /// Tasks accepted by the scheduler
    pub scheduled: u64,

    /// Responses with a status below 400
    pub downloaded: u64,

    /// Pages whose content was parsed
    pub parsed: u64,

    /// Responses with a status of 400 or above
    pub errors: u64,

    /// When the last response from this domain was recorded
    pub last_downloaded_at: Option<Instant>,

    /// When a request to this domain was last dispatched
    pub last_dispatched_at: Option<Instant>,

    /// HTTP status code -> error responses with that status
    pub http_errors: HashMap<u16, u64>,

    /// Requests acquired and not yet released
    pub active_requests: u32,
}

impl DomainState {
    /// Creates an empty state for `domain_name`
    pub fn new(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            scheduled: 0,
            downloaded: 0,
            parsed: 0,
            errors: 0,
            last_downloaded_at: None,
            last_dispatched_at: None,
            http_errors: HashMap::new(),
            active_requests: 0,
        }
    }

    pub fn record_scheduled(&mut self) {
        self.scheduled += 1;
    }

    /// Records a response
    ///
    /// A status of 400 or above counts as an error and is added to the
    /// histogram; anything else counts as downloaded.
    pub fn record_download(&mut self, status: u16, now: Instant) {
        if status >= 400 {
            self.errors += 1;
            *self.http_errors.entry(status).or_insert(0) += 1;
        } else {
            self.downloaded += 1;
        }
        self.last_downloaded_at = Some(now);
    }

    pub fn record_parsed(&mut self) {
        self.parsed += 1;
    }

    /// Takes a request slot unless `limit` slots are taken (0 = unlimited)
    pub fn try_acquire(&mut self, limit: u32) -> bool {
        if limit > 0 && self.active_requests >= limit {
            return false;
        }
        self.active_requests += 1;
        true
    }

    /// Records that a request was dispatched to this domain
    pub fn record_dispatch(&mut self, now: Instant) {
        self.last_dispatched_at = Some(now);
    }

    /// Records that a dispatched request finished
    pub fn record_release(&mut self) {
        self.active_requests = self.active_requests.saturating_sub(1);
    }

    /// Calculates the time until the next request is polite
    ///
    /// Both the last dispatch and the last download must be at least `period`
    /// in the past. Returns None if a request can be made now.
    pub fn time_until_polite(&self, period: Duration, now: Instant) -> Option<Duration> {
        if period.is_zero() {
            return None;
        }

        [self.last_dispatched_at, self.last_downloaded_at]
            .into_iter()
            .flatten()
            .filter_map(|at| {
                let elapsed = now.saturating_duration_since(at);
                (elapsed < period).then(|| period - elapsed)
            })
            .max()
    }

    /// Responses recorded with `status`
    pub fn http_error_count(&self, status: u16) -> u64 {
        self.http_errors.get(&status).copied().unwrap_or(0)
    }

    /// Returns the first configured limit this domain has reached
    pub fn tripped_limit(&self, limits: &[HttpErrorLimit]) -> Option<(HttpErrorLimit, u64)> {
        limits.iter().find_map(|limit| {
            let count = self.http_error_count(limit.status);
            (count >= limit.limit).then_some((*limit, count))
        })
    }

    /// Converts the counters into a persistable record
    pub fn to_record(&self) -> DomainRecord {
        DomainRecord {
            domain: self.domain_name.clone(),
            scheduled: self.scheduled,
            downloaded: self.downloaded,
            parsed: self.parsed,
            errors: self.errors,
            http_errors: self.http_errors.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }
}
