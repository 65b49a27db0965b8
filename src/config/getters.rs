//! Accessor methods for the configuration types.

use std::path::Path;
use std::time::Duration;

use super::types::{CrawlOptions, FetchOptions, IngestConfig};

impl FetchOptions {
    #[must_use]
    pub fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.nav_timeout_secs)
    }

    #[must_use]
    pub fn settle_ms(&self) -> u64 {
        self.settle_ms
    }

    #[must_use]
    pub fn min_content_len(&self) -> usize {
        self.min_content_len
    }

    #[must_use]
    pub fn wait_selector(&self) -> Option<&str> {
        self.wait_selector.as_deref()
    }

    #[must_use]
    pub fn scroll_page(&self) -> bool {
        self.scroll_page
    }

    #[must_use]
    pub fn capture_screenshot(&self) -> bool {
        self.capture_screenshot
    }
}

impl CrawlOptions {
    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    #[must_use]
    pub fn max_consecutive_empty(&self) -> u32 {
        self.max_consecutive_empty
    }

    #[must_use]
    pub fn same_domain_only(&self) -> bool {
        self.same_domain_only
    }

    #[must_use]
    pub fn rate_limit_ms(&self) -> u64 {
        self.rate_limit_ms
    }

    #[must_use]
    pub fn candidate_urls(&self) -> Option<&[String]> {
        self.candidate_urls.as_deref()
    }

    #[must_use]
    pub fn link_patterns(&self) -> &[String] {
        &self.link_patterns
    }

    #[must_use]
    pub fn max_links_per_page(&self) -> usize {
        self.max_links_per_page
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    #[must_use]
    pub fn fetch(&self) -> &FetchOptions {
        &self.fetch
    }
}

impl IngestConfig {
    #[must_use]
    pub fn chrome_executable(&self) -> Option<&Path> {
        self.chrome_executable.as_deref()
    }

    #[must_use]
    pub fn user_data_dir(&self) -> Option<&Path> {
        self.user_data_dir.as_deref()
    }

    #[must_use]
    pub fn headed(&self) -> bool {
        self.headed
    }

    #[must_use]
    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    #[must_use]
    pub fn crawl(&self) -> &CrawlOptions {
        &self.crawl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_polite() {
        let opts = CrawlOptions::default();
        assert_eq!(opts.max_pages(), 10);
        assert!(opts.same_domain_only());
        assert!(opts.rate_limit_ms() >= 1000);
        assert!(opts.candidate_urls().is_none());
        assert!(opts.link_patterns().is_empty());
    }

    #[test]
    fn setters_clamp_degenerate_values() {
        let opts = CrawlOptions::default()
            .with_max_pages(0)
            .with_max_links_per_page(0)
            .with_max_consecutive_empty(0);
        assert_eq!(opts.max_pages(), 1);
        assert_eq!(opts.max_links_per_page(), 1);
        assert_eq!(opts.max_consecutive_empty(), 1);
    }

    #[test]
    fn fetch_options_round_trip_through_crawl_options() {
        let opts = CrawlOptions::default()
            .with_fetch(FetchOptions::default().with_min_content_len(50).with_screenshot(true));
        assert_eq!(opts.fetch().min_content_len(), 50);
        assert!(opts.fetch().capture_screenshot());
    }
}
