//! Crawler module for dispatching and processing crawl tasks
//!
//! This module contains the core crawling logic, including:
//! - Crawl tasks and the pages they produce
//! - The pluggable crawl strategy and its default HTTP implementation
//! - HTML parsing and link extraction
//! - Per-domain admission control
//! - Scheduling with at-most-once semantics
//! - Overall crawl coordination

mod admission;
mod controller;
mod fetcher;
mod page;
mod parser;
mod scheduler;
mod strategy;
mod task;

pub use admission::{AdmissionController, Denial, DispatchPermit};
pub use controller::{CrawlController, CrawlWorker};
pub use fetcher::{build_http_client, http_crawlers, FetchRuntime, HttpCrawler};
pub use page::Page;
pub use parser::{parse_html, ParsedPage};
pub use scheduler::Scheduler;
pub use strategy::{same_domain, Crawler};
pub use task::CrawlTask;
