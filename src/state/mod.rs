//! State module for tracking crawl progress
//!
//! This module provides the per-domain state shared by the workers.
//!
//! # Components
//!
//! - `DomainState`: Counters, politeness timestamps, error histogram and
//!   active request count of one domain
//! - `DomainRegistry`: The lock-protected table of all domain states
//! - `StatisticsService`: Seen-URL bookkeeping and statistics updates

mod domain_state;
mod registry;
mod statistics;

// Re-export main types
pub use domain_state::DomainState;
pub use registry::DomainRegistry;
pub use statistics::{CrawlTotals, StatisticsService};
