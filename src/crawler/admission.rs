//! Per-domain admission control
//!
//! This module decides whether a task may be dispatched to its domain now:
//! - HTTP error breaker: a domain that reached a configured error limit is
//!   never crawled again in this process
//! - Politeness: consecutive requests to a domain are spaced out
//! - Parallelism: concurrent requests to a domain are capped

use crate::config::Config;
use crate::state::{DomainRegistry, DomainState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Reason a task may not be dispatched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("domain reached the limit of {limit} HTTP {status} responses ({count} received)")]
    ErrorLimit { status: u16, count: u64, limit: u64 },

    #[error("politeness period not elapsed, {wait:?} to go")]
    Politeness { wait: Duration },

    #[error("{active} requests already running (limit {limit})")]
    Parallelism { active: u32, limit: u32 },
}

impl Denial {
    /// Permanent denials drop the task; the others defer it
    pub fn is_permanent(&self) -> bool {
        matches!(self, Denial::ErrorLimit { .. })
    }
}

/// A request slot held on a domain
///
/// The slot is released when the permit is dropped.
pub struct DispatchPermit<'a> {
    controller: &'a AdmissionController,
    domain: String,
}

impl DispatchPermit<'_> {
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Drop for DispatchPermit<'_> {
    fn drop(&mut self) {
        self.controller.release(&self.domain);
    }
}

/// Applies the error breaker, politeness and parallelism limits
pub struct AdmissionController {
    registry: Arc<DomainRegistry>,
    config: Arc<Config>,
}

impl AdmissionController {
    pub fn new(registry: Arc<DomainRegistry>, config: Arc<Config>) -> Self {
        Self { registry, config }
    }

    /// Checks the error breaker and politeness for a domain
    ///
    /// The breaker is checked first; a tripped breaker never resets.
    pub fn can_dispatch(&self, state: &DomainState, now: Instant) -> Result<(), Denial> {
        if let Some((limit, count)) = state.tripped_limit(&self.config.http_error_limits) {
            return Err(Denial::ErrorLimit {
                status: limit.status,
                count,
                limit: limit.limit,
            });
        }

        let period = self.config.limits_for(&state.domain_name).politeness_period;
        if let Some(wait) = state.time_until_polite(period, now) {
            return Err(Denial::Politeness { wait });
        }

        Ok(())
    }

    /// Takes a request slot on `domain` if one is free
    pub fn acquire(&self, domain: &str) -> bool {
        let limit = self.config.limits_for(domain).max_parallel_requests;
        self.registry.update(domain, |state| state.try_acquire(limit))
    }

    /// Gives back a slot taken by [`AdmissionController::acquire`]
    pub fn release(&self, domain: &str) {
        self.registry.update(domain, DomainState::record_release);
    }

    /// Checks all limits and takes a request slot in one step
    ///
    /// On success the dispatch time is recorded and the returned permit holds
    /// the slot until it is dropped.
    pub fn try_dispatch(&self, domain: &str) -> Result<DispatchPermit<'_>, Denial> {
        let now = Instant::now();
        let limit = self.config.limits_for(domain).max_parallel_requests;

        self.registry.update(domain, |state| {
            self.can_dispatch(state, now)?;
            if !state.try_acquire(limit) {
                return Err(Denial::Parallelism {
                    active: state.active_requests,
                    limit,
                });
            }
            state.record_dispatch(now);
            Ok(())
        })?;

        Ok(DispatchPermit {
            controller: self,
            domain: domain.to_string(),
        })
    }
}
