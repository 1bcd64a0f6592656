//! End-to-end crawls through the controller with scripted sites

use crate::common::{
    controller, crawl_to_completion, site_crawlers, test_config, Site, IDLE_POLL, IDLE_WAIT,
};
use ripple_frontier::config::{DomainConstraints, HttpErrorLimit};
use ripple_frontier::FrontierError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_politeness_spaces_requests_to_one_domain() {
    let site = Arc::new(
        Site::new()
            .page(
                "https://polite.test/",
                &["https://polite.test/a", "https://polite.test/b"],
            )
            .page("https://polite.test/a", &[])
            .page("https://polite.test/b", &[]),
    );

    let mut config = test_config(&["https://polite.test/"]);
    config.crawler.workers = 3;
    config.crawler.max_parallel_requests = 1;
    config.crawler.politeness_period = 1000;
    config.crawler.defer_timeout = 50;

    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    let mut visits = site.visits();
    assert_eq!(visits.len(), 3);
    visits.sort_by_key(|visit| visit.at);

    for pair in visits.windows(2) {
        let gap = pair[1].at.duration_since(pair[0].at);
        assert!(
            gap >= Duration::from_millis(1000),
            "{} followed {} after only {:?}",
            pair[1].url,
            pair[0].url,
            gap
        );
    }
}

#[test]
fn test_parallel_requests_stay_within_limit() {
    let pages: Vec<String> = (1..=8).map(|i| format!("https://busy.test/{}", i)).collect();
    let links: Vec<&str> = pages.iter().map(String::as_str).collect();

    let mut site = Site::new()
        .page("https://busy.test/", &links)
        .with_delay(Duration::from_millis(30));
    for page in &pages {
        site = site.page(page, &[]);
    }
    let site = Arc::new(site);

    let mut config = test_config(&["https://busy.test/"]);
    config.crawler.workers = 4;
    config.crawler.max_parallel_requests = 2;
    config.crawler.defer_timeout = 5;

    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    assert_eq!(site.visits().len(), 9);
    assert!(site.max_active() <= 2, "saw {} parallel requests", site.max_active());
    assert_eq!(controller.statistics().domain_statistics("busy.test").active_requests, 0);
}

#[test]
fn test_every_url_is_crawled_at_most_once() {
    let pages: Vec<String> = (0..20).map(|i| format!("https://mesh.test/{}", i)).collect();
    let links: Vec<&str> = pages.iter().map(String::as_str).collect();

    // Every page links to every page, itself included
    let mut site = Site::new();
    for page in &pages {
        site = site.page(page, &links);
    }
    let site = Arc::new(site);

    let mut config = test_config(&["https://mesh.test/0"]);
    config.crawler.workers = 4;
    config.crawler.max_parallel_requests = 0;
    // Forces the queue through the overflow store
    config.storage.queue_capacity = 4;

    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    let counts = site.visit_counts();
    assert_eq!(counts.len(), 20);
    assert!(counts.values().all(|count| *count == 1), "{:?}", counts);

    let statistics = controller.statistics();
    assert_eq!(statistics.totals().scheduled, 20);
    assert_eq!(statistics.totals().downloaded, 20);
    assert_eq!(statistics.seen_count(), 20);
}

#[test]
fn test_seed_and_self_links_share_one_url_key() {
    let site = Arc::new(Site::new().page(
        "https://dup.test/p?a=1&b=2",
        &[
            "https://dup.test/p?a=1&b=2",
            "https://dup.test/p?b=2&a=1",
            "https://dup.test/p?a=1&b=2&utm_source=feed#top",
        ],
    ));

    let config = test_config(&["https://dup.test/p?b=2&a=1"]);
    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    let counts = site.visit_counts();
    assert_eq!(counts.len(), 1, "{:?}", counts);
    assert_eq!(counts.get("https://dup.test/p?a=1&b=2"), Some(&1));
    assert_eq!(controller.statistics().domain_statistics("dup.test").scheduled, 1);
}

#[test]
fn test_queue_accounting_is_empty_after_crawl() {
    let site = Arc::new(
        Site::new()
            .page("https://tidy.test/", &["https://tidy.test/x"])
            .page("https://tidy.test/x", &[]),
    );

    let mut config = test_config(&["https://tidy.test/"]);
    config.crawler.max_parallel_requests = 1;
    config.crawler.politeness_period = 20;

    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    let queue = controller.queue();
    assert_eq!(queue.size(), 0);
    assert_eq!(queue.queued_len(), 0);
    assert_eq!(queue.deferred_len(), 0);
    assert_eq!(queue.processing_count(), 0);
    assert_eq!(queue.in_flight("tidy.test"), 0);
}

#[test]
fn test_redirect_becomes_task_at_same_level() {
    let site = Arc::new(
        Site::new()
            .redirect("https://moved.test/old", "https://moved.test/new")
            .redirect("https://moved.test/alias", "https://moved.test/new")
            .page(
                "https://moved.test/new",
                &["https://moved.test/old", "https://moved.test/new"],
            ),
    );

    let mut config = test_config(&["https://moved.test/old", "https://moved.test/alias"]);
    config.crawler.workers = 1;

    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    let counts = site.visit_counts();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts["https://moved.test/new"], 1);

    let target = site
        .visits()
        .into_iter()
        .find(|visit| visit.url == "https://moved.test/new")
        .unwrap();
    assert_eq!(target.level, 0);
    assert_eq!(
        target.custom_data,
        Some(json!({ "redirected_from": "https://moved.test/old" }))
    );

    let state = controller.statistics().domain_statistics("moved.test");
    assert_eq!(state.scheduled, 3);
    assert_eq!(state.downloaded, 3);
    assert_eq!(state.parsed, 1);
}

#[test]
fn test_error_limit_abandons_domain() {
    let missing: Vec<String> = (1..=5)
        .map(|i| format!("https://flaky.test/missing{}", i))
        .collect();
    let links: Vec<&str> = missing.iter().map(String::as_str).collect();
    let site = Arc::new(Site::new().page("https://flaky.test/", &links));

    let mut config = test_config(&["https://flaky.test/"]);
    config.crawler.workers = 1;
    config.http_error_limits = vec![HttpErrorLimit {
        status: 404,
        limit: 2,
    }];

    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    // The seed and two misses; the remaining tasks are dropped unvisited
    assert_eq!(site.visits().len(), 3);

    let state = controller.statistics().domain_statistics("flaky.test");
    assert_eq!(state.scheduled, 6);
    assert_eq!(state.http_error_count(404), 2);
    assert_eq!(state.errors, 2);
    assert_eq!(controller.tasks_count(), 0);
}

#[test]
fn test_other_statuses_do_not_trip_breaker() {
    let site = Arc::new(
        Site::new()
            .page(
                "https://mixed.test/",
                &[
                    "https://mixed.test/a",
                    "https://mixed.test/b",
                    "https://mixed.test/c",
                ],
            )
            .status("https://mixed.test/a", 500)
            .status("https://mixed.test/b", 500)
            .page("https://mixed.test/c", &[]),
    );

    let mut config = test_config(&["https://mixed.test/"]);
    config.crawler.workers = 1;
    config.http_error_limits = vec![HttpErrorLimit {
        status: 404,
        limit: 1,
    }];

    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    assert_eq!(site.visits().len(), 4);
    let state = controller.statistics().domain_statistics("mixed.test");
    assert_eq!(state.http_error_count(500), 2);
    assert_eq!(state.downloaded, 2);
}

#[test]
fn test_depth_limit_with_domain_override() {
    let site = Arc::new(
        Site::new()
            .page("https://shallow.test/", &["https://shallow.test/1"])
            .page("https://shallow.test/1", &["https://shallow.test/2"])
            .page("https://shallow.test/2", &[])
            .page("https://deep.test/", &["https://deep.test/1"])
            .page("https://deep.test/1", &["https://deep.test/2"])
            .page("https://deep.test/2", &[]),
    );

    let mut config = test_config(&["https://shallow.test/", "https://deep.test/"]);
    config.crawler.max_level = 1;
    config.domains = vec![DomainConstraints {
        name: "deep.test".to_string(),
        max_level: Some(0),
        ..DomainConstraints::default()
    }];

    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    let counts = site.visit_counts();
    assert!(counts.contains_key("https://shallow.test/1"));
    assert!(!counts.contains_key("https://shallow.test/2"));
    assert!(counts.contains_key("https://deep.test/2"));
    assert_eq!(counts.len(), 5);
}

#[test]
fn test_links_to_other_domains_are_not_followed() {
    let site = Arc::new(
        Site::new()
            .page(
                "https://home.test/",
                &["https://www.home.test/about", "https://away.test/"],
            )
            .page("https://www.home.test/about", &[])
            .page("https://away.test/", &[]),
    );

    let config = test_config(&["https://home.test/"]);
    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);

    let counts = site.visit_counts();
    assert!(counts.contains_key("https://www.home.test/about"));
    assert!(!counts.contains_key("https://away.test/"));
}

#[test]
fn test_seed_added_while_running() {
    let site = Arc::new(
        Site::new()
            .page("https://first.test/", &[])
            .page("https://second.test/", &[]),
    );

    let config = test_config(&["https://first.test/"]);
    let controller = controller(config.clone(), site_crawlers(&site, &config));
    controller.start().unwrap();

    controller.add_seed("https://second.test/").unwrap();
    assert!(controller.wait_until_idle(IDLE_POLL, IDLE_WAIT));
    assert!(controller.stop());

    assert_eq!(site.visits().len(), 2);
    assert!(matches!(
        controller.add_seed("https://third.test/"),
        Err(FrontierError::Stopped)
    ));
}

#[test]
fn test_statistics_survive_persist() {
    let site = Arc::new(Site::new().page("https://kept.test/", &[]));

    let config = test_config(&["https://kept.test/"]);
    let controller = controller(config.clone(), site_crawlers(&site, &config));
    crawl_to_completion(&controller);
    controller.persist_statistics().unwrap();

    let records = controller.statistics().domain_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].domain, "kept.test");
    assert_eq!(records[0].downloaded, 1);
}
