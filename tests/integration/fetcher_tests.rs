//! HTTP crawl strategy against a wiremock server

use crate::common::{controller, crawl_to_completion, test_config};
use ripple_frontier::config::{Config, FetcherConfig};
use ripple_frontier::crawler::{build_http_client, http_crawlers, FetchRuntime, HttpCrawler};
use ripple_frontier::{CrawlTask, Crawler};
use std::sync::Arc;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME: &str = r#"<html>
<head><title>Home</title></head>
<body>
    <a href="/a">A</a>
    <a href="/b">B</a>
    <a href="/missing">Missing</a>
    <a href="mailto:someone@example.com">Mail</a>
</body>
</html>"#;

const LEAF: &str = "<html><head><title>Leaf</title></head><body>No links</body></html>";

/// Starts a mock server with a small site
///
/// The runtime must outlive the server.
fn site() -> (Runtime, MockServer) {
    let runtime = Runtime::new().unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(HOME, "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(LEAF, "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/a"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/report.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
            .mount(&server)
            .await;

        server
    });

    (runtime, server)
}

fn http_crawler(config: &Config, fetcher: FetcherConfig) -> HttpCrawler {
    let client = build_http_client(&config.user_agent, &fetcher).unwrap();
    HttpCrawler::new(client, Arc::new(FetchRuntime::new(1).unwrap()), fetcher)
}

fn crawl(crawler: &mut HttpCrawler, url: &str) -> (CrawlTask, Option<ripple_frontier::Page>) {
    let mut task = CrawlTask::new(url, 0).unwrap();
    let page = crawler.crawl(&mut task).unwrap();
    (task, page)
}

#[test]
fn test_downloads_and_parses_html() {
    let (_runtime, server) = site();
    let config = test_config(&[]);
    let mut crawler = http_crawler(&config, config.fetcher.clone());

    let (task, page) = crawl(&mut crawler, &format!("{}/", server.uri()));
    let page = page.unwrap();

    assert_eq!(page.response_code, 200);
    assert_eq!(page.title.as_deref(), Some("Home"));
    assert_eq!(
        page.links,
        Some(vec![
            format!("{}/a", server.uri()),
            format!("{}/b", server.uri()),
            format!("{}/missing", server.uri()),
        ])
    );
    assert!(task.downloaded_at.is_some());
    assert!(task.parsed_at.is_some());
}

#[test]
fn test_reports_redirect_target() {
    let (_runtime, server) = site();
    let config = test_config(&[]);
    let mut crawler = http_crawler(&config, config.fetcher.clone());

    let (_, page) = crawl(&mut crawler, &format!("{}/b", server.uri()));
    let page = page.unwrap();

    assert_eq!(page.response_code, 301);
    assert_eq!(
        page.redirect_target(),
        Some(format!("{}/a", server.uri()).as_str())
    );
    assert!(page.links.is_none());
}

#[test]
fn test_error_status_is_still_a_page() {
    let (_runtime, server) = site();
    let config = test_config(&[]);
    let mut crawler = http_crawler(&config, config.fetcher.clone());

    let (task, page) = crawl(&mut crawler, &format!("{}/missing", server.uri()));

    assert_eq!(page.unwrap().response_code, 404);
    assert!(task.downloaded_at.is_some());
    assert!(task.parsed_at.is_none());
}

#[test]
fn test_skips_disallowed_content_type() {
    let (_runtime, server) = site();
    let config = test_config(&[]);
    let mut crawler = http_crawler(&config, config.fetcher.clone());

    let (_, page) = crawl(&mut crawler, &format!("{}/report.pdf", server.uri()));
    assert!(page.is_none());
}

#[test]
fn test_skips_oversized_content() {
    let (_runtime, server) = site();
    let config = test_config(&[]);
    let fetcher = FetcherConfig {
        max_content_length: 16,
        ..config.fetcher.clone()
    };
    let mut crawler = http_crawler(&config, fetcher);

    let (_, page) = crawl(&mut crawler, &format!("{}/", server.uri()));
    assert!(page.is_none());
}

#[test]
fn test_crawl_mock_site_end_to_end() {
    let (_runtime, server) = site();
    let seed = format!("{}/", server.uri());

    let mut config = test_config(&[seed.as_str()]);
    config.crawler.workers = 2;
    let domain = CrawlTask::new(&seed, 0).unwrap().domain;

    let controller = controller(config.clone(), http_crawlers(&config).unwrap());
    crawl_to_completion(&controller);

    // "/", "/a", "/b" (301 to the already seen "/a") and the 404
    let state = controller.statistics().domain_statistics(&domain);
    assert_eq!(state.scheduled, 4);
    assert_eq!(state.downloaded, 3);
    assert_eq!(state.parsed, 2);
    assert_eq!(state.errors, 1);
    assert_eq!(state.http_error_count(404), 1);
}
