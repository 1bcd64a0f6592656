//! Resolution of per-domain crawl limits
//!
//! A domain's effective limits are the global `[crawler]` values with any
//! matching `[[domain]]` override applied field by field.

use crate::config::types::{Config, DomainConstraints};
use crate::url::most_specific;
use std::time::Duration;

/// Effective crawl limits for one domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainLimits {
    /// Maximum link depth (0 = unlimited)
    pub max_level: u32,
    /// Maximum concurrent requests (0 = unlimited)
    pub max_parallel_requests: u32,
    /// Minimum spacing between dispatches (zero = disabled)
    pub politeness_period: Duration,
}

impl DomainLimits {
    /// Returns true if a task at `level` is within the depth limit
    pub fn allows_level(&self, level: u32) -> bool {
        self.max_level == 0 || level <= self.max_level
    }
}

impl Config {
    /// Finds the constraint entry that applies to `domain`, if any
    ///
    /// Exact names win over wildcard patterns; among wildcards the longest
    /// pattern wins.
    pub fn domain_constraints(&self, domain: &str) -> Option<&DomainConstraints> {
        most_specific(self.domains.iter().map(|d| d.name.as_str()), domain)
            .map(|index| &self.domains[index])
    }

    /// Computes the effective limits for `domain`
    pub fn limits_for(&self, domain: &str) -> DomainLimits {
        let constraints = self.domain_constraints(domain);

        DomainLimits {
            max_level: constraints
                .and_then(|c| c.max_level)
                .unwrap_or(self.crawler.max_level),
            max_parallel_requests: constraints
                .and_then(|c| c.max_parallel_requests)
                .unwrap_or(self.crawler.max_parallel_requests),
            politeness_period: Duration::from_millis(
                constraints
                    .and_then(|c| c.politeness_period)
                    .unwrap_or(self.crawler.politeness_period),
            ),
        }
    }

    /// Delay applied when a task is deferred by admission control
    pub fn defer_timeout(&self) -> Duration {
        Duration::from_millis(self.crawler.defer_timeout)
    }
}
