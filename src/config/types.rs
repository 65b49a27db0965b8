//! Core configuration types for ingest crawls.
//!
//! This module contains the option structs and their fluent setters. All
//! accessors live in `getters`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::util::constants::{
    DEFAULT_EMPTY_PAGE_STOP, DEFAULT_MAX_LINKS_PER_PAGE, DEFAULT_MAX_PAGES,
    DEFAULT_MIN_CONTENT_LEN, DEFAULT_NAV_TIMEOUT_SECS, DEFAULT_RATE_LIMIT_MS, DEFAULT_SETTLE_MS,
};

/// Knobs for a single page fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Upper bound on navigation, in seconds.
    pub(crate) nav_timeout_secs: u64,

    /// Pause after load before extraction, in milliseconds. Gives
    /// client-side frameworks a beat to hydrate.
    pub(crate) settle_ms: u64,

    /// Rendered-HTML length below which a 2xx page is classified as
    /// `no_content` instead of `ok`.
    pub(crate) min_content_len: usize,

    /// CSS selector to wait for after navigation, best effort. Useful for
    /// single-page apps whose content mounts well after `load`.
    pub(crate) wait_selector: Option<String>,

    /// Scroll the page before extraction to trigger lazy-loaded content.
    pub(crate) scroll_page: bool,

    /// Capture a JPEG screenshot of the rendered page.
    pub(crate) capture_screenshot: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            nav_timeout_secs: DEFAULT_NAV_TIMEOUT_SECS,
            settle_ms: DEFAULT_SETTLE_MS,
            min_content_len: DEFAULT_MIN_CONTENT_LEN,
            wait_selector: None,
            scroll_page: true,
            capture_screenshot: false,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn with_nav_timeout_secs(mut self, secs: u64) -> Self {
        self.nav_timeout_secs = secs.max(1);
        self
    }

    #[must_use]
    pub fn with_settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }

    #[must_use]
    pub fn with_min_content_len(mut self, len: usize) -> Self {
        self.min_content_len = len;
        self
    }

    #[must_use]
    pub fn with_wait_selector(mut self, selector: impl Into<String>) -> Self {
        self.wait_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_scroll_page(mut self, scroll: bool) -> Self {
        self.scroll_page = scroll;
        self
    }

    #[must_use]
    pub fn with_screenshot(mut self, capture: bool) -> Self {
        self.capture_screenshot = capture;
        self
    }
}

/// Budget and discovery policy for one crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlOptions {
    /// Pages captured before the crawl stops.
    pub(crate) max_pages: usize,

    /// Consecutive empty or failed fetches before the crawl gives up
    /// on the site.
    pub(crate) max_consecutive_empty: u32,

    /// Restrict discovery to the seed's site (`www.` treated as
    /// equivalent to the bare host).
    pub(crate) same_domain_only: bool,

    /// Floor between two fetches in the same crawl, in milliseconds.
    /// The per-domain risk delay can stretch this further, never shrink it.
    pub(crate) rate_limit_ms: u64,

    /// Explicit pages to fetch. When set, these URLs become the whole
    /// worklist: the seed is not fetched and link discovery is skipped.
    pub(crate) candidate_urls: Option<Vec<String>>,

    /// Regexes a discovered link's path must match (any of) to be
    /// enqueued. Empty means every same-site link qualifies.
    pub(crate) link_patterns: Vec<String>,

    /// Candidate links taken from a single page.
    pub(crate) max_links_per_page: usize,

    /// Wall-clock budget for the whole crawl.
    pub(crate) deadline: Option<Duration>,

    /// Per-fetch knobs applied to every page in the crawl.
    pub(crate) fetch: FetchOptions,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_consecutive_empty: DEFAULT_EMPTY_PAGE_STOP,
            same_domain_only: true,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            candidate_urls: None,
            link_patterns: Vec::new(),
            max_links_per_page: DEFAULT_MAX_LINKS_PER_PAGE,
            deadline: None,
            fetch: FetchOptions::default(),
        }
    }
}

impl CrawlOptions {
    #[must_use]
    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages.max(1);
        self
    }

    #[must_use]
    pub fn with_max_consecutive_empty(mut self, count: u32) -> Self {
        self.max_consecutive_empty = count.max(1);
        self
    }

    #[must_use]
    pub fn with_same_domain_only(mut self, restrict: bool) -> Self {
        self.same_domain_only = restrict;
        self
    }

    #[must_use]
    pub fn with_rate_limit_ms(mut self, ms: u64) -> Self {
        self.rate_limit_ms = ms;
        self
    }

    /// Provide the exact pages to fetch, bypassing link discovery.
    #[must_use]
    pub fn with_candidate_urls(mut self, urls: Vec<String>) -> Self {
        self.candidate_urls = Some(urls);
        self
    }

    /// Topic-relevance filters for discovered links. Each entry is a
    /// regex applied (case-insensitively) to the link's URL path.
    #[must_use]
    pub fn with_link_patterns(mut self, patterns: Vec<String>) -> Self {
        self.link_patterns = patterns;
        self
    }

    #[must_use]
    pub fn with_max_links_per_page(mut self, count: usize) -> Self {
        self.max_links_per_page = count.max(1);
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }
}

/// Engine-level configuration: browser placement and store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Chrome/Chromium binary to launch. `None` searches the usual
    /// install locations and falls back to a managed download.
    pub(crate) chrome_executable: Option<PathBuf>,

    /// Browser profile directory. `None` creates a throwaway temp dir
    /// that is removed on shutdown.
    pub(crate) user_data_dir: Option<PathBuf>,

    /// Run the browser without a visible window. On by default; only
    /// worth disabling when debugging a misbehaving site.
    pub(crate) headed: bool,

    /// SQLite file for risk records, fetch fingerprints, and ingest
    /// results. `None` resolves to the platform data dir.
    pub(crate) store_path: Option<PathBuf>,

    /// Crawl defaults used when the caller does not pass options.
    pub(crate) crawl: CrawlOptions,
}

impl IngestConfig {
    #[must_use]
    pub fn with_chrome_executable(mut self, path: PathBuf) -> Self {
        self.chrome_executable = Some(path);
        self
    }

    #[must_use]
    pub fn with_user_data_dir(mut self, dir: PathBuf) -> Self {
        self.user_data_dir = Some(dir);
        self
    }

    #[must_use]
    pub fn with_headed(mut self, headed: bool) -> Self {
        self.headed = headed;
        self
    }

    #[must_use]
    pub fn with_store_path(mut self, path: PathBuf) -> Self {
        self.store_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_crawl(mut self, crawl: CrawlOptions) -> Self {
        self.crawl = crawl;
        self
    }
}
