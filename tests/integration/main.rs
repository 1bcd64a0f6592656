//! Integration tests for the crawl frontier
//!
//! The frontier tests drive the controller with scripted crawl strategies.
//! The fetcher tests use wiremock to serve real HTTP responses.

mod common;
mod fetcher_tests;
mod frontier_tests;
mod queue_tests;
