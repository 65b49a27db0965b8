//! Configuration defaults, builder composition, and serde round-trips.

use std::path::PathBuf;
use std::time::Duration;

use orbit_ingest::{CrawlOptions, FetchOptions, IngestConfig};

#[test]
fn fetch_defaults_match_documented_behavior() {
    let fetch = FetchOptions::default();
    assert_eq!(fetch.nav_timeout(), Duration::from_secs(45));
    assert_eq!(fetch.settle_ms(), 800);
    assert_eq!(fetch.min_content_len(), 1000);
    assert_eq!(fetch.wait_selector(), None);
    assert!(fetch.scroll_page());
    assert!(!fetch.capture_screenshot());
}

#[test]
fn crawl_defaults_match_documented_behavior() {
    let crawl = CrawlOptions::default();
    assert_eq!(crawl.max_pages(), 10);
    assert_eq!(crawl.max_consecutive_empty(), 3);
    assert!(crawl.same_domain_only());
    assert_eq!(crawl.rate_limit_ms(), 1500);
    assert!(crawl.candidate_urls().is_none());
    assert!(crawl.link_patterns().is_empty());
    assert_eq!(crawl.max_links_per_page(), 25);
    assert!(crawl.deadline().is_none());
}

#[test]
fn builders_compose_into_one_config() {
    let config = IngestConfig::default()
        .with_store_path(PathBuf::from("/tmp/orbit-test.db"))
        .with_headed(true)
        .with_crawl(
            CrawlOptions::default()
                .with_max_pages(4)
                .with_link_patterns(vec!["/posts/".into(), "/blog/".into()])
                .with_deadline(Duration::from_secs(90))
                .with_fetch(
                    FetchOptions::default()
                        .with_wait_selector("#app")
                        .with_screenshot(true),
                ),
        );

    assert_eq!(config.store_path(), Some(PathBuf::from("/tmp/orbit-test.db").as_path()));
    assert!(config.headed());
    assert_eq!(config.crawl().max_pages(), 4);
    assert_eq!(config.crawl().link_patterns().len(), 2);
    assert_eq!(config.crawl().deadline(), Some(Duration::from_secs(90)));
    assert_eq!(config.crawl().fetch().wait_selector(), Some("#app"));
    assert!(config.crawl().fetch().capture_screenshot());
}

#[test]
fn zero_budgets_clamp_to_usable_minimums() {
    let crawl = CrawlOptions::default()
        .with_max_pages(0)
        .with_max_consecutive_empty(0)
        .with_max_links_per_page(0);
    assert_eq!(crawl.max_pages(), 1);
    assert_eq!(crawl.max_consecutive_empty(), 1);
    assert_eq!(crawl.max_links_per_page(), 1);

    let fetch = FetchOptions::default().with_nav_timeout_secs(0);
    assert_eq!(fetch.nav_timeout(), Duration::from_secs(1));
}

#[test]
fn config_round_trips_through_json() {
    let config = IngestConfig::default()
        .with_store_path(PathBuf::from("/var/lib/orbit/ingest.db"))
        .with_crawl(
            CrawlOptions::default()
                .with_candidate_urls(vec!["https://example.com/a".into()])
                .with_rate_limit_ms(250),
        );

    let json = serde_json::to_string(&config).unwrap();
    let back: IngestConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.store_path(), config.store_path());
    assert_eq!(back.crawl().rate_limit_ms(), 250);
    assert_eq!(
        back.crawl().candidate_urls().unwrap(),
        ["https://example.com/a"]
    );
}
