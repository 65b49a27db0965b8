//! Tuning constants for the ingest engine.
//!
//! Defaults here are starting points; anything that callers commonly need to
//! adjust is also exposed through [`IngestConfig`](crate::config::IngestConfig).

use std::time::Duration;

// ---------------------------------------------------------------------------
// Browser session
// ---------------------------------------------------------------------------

/// User agent reported by ingest browser sessions.
pub const ORBIT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

/// Viewport width applied to every page.
pub const VIEWPORT_WIDTH: u32 = 1920;

/// Viewport height applied to every page.
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// Timeout for individual CDP requests to the browser process.
pub const BROWSER_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a single page navigation, load included.
pub const DEFAULT_NAV_TIMEOUT_SECS: u64 = 45;

/// Pause after load before extraction, letting client-side rendering settle.
pub const DEFAULT_SETTLE_MS: u64 = 800;

/// How long to drain buffered network events after navigation completes.
pub const RESPONSE_EVENT_DRAIN_MS: u64 = 500;

/// Budget for the best-effort readiness and selector waits after load.
pub const READY_WAIT_SECS: u64 = 10;

/// Pixels scrolled per step when coaxing lazy-loaded content.
pub const SCROLL_STEP_PX: u32 = 1200;

/// Maximum scroll steps per page.
pub const SCROLL_MAX_STEPS: u32 = 10;

/// Pause between scroll steps.
pub const SCROLL_PAUSE_MS: u64 = 250;

/// JPEG quality for optional page screenshots.
pub const SCREENSHOT_QUALITY: i64 = 80;

// ---------------------------------------------------------------------------
// Fetch classification
// ---------------------------------------------------------------------------

/// Minimum rendered-HTML length for a 2xx page to count as having content.
pub const DEFAULT_MIN_CONTENT_LEN: usize = 1000;

// ---------------------------------------------------------------------------
// Crawl budget
// ---------------------------------------------------------------------------

/// Pages captured per crawl unless the caller asks otherwise.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Consecutive empty or failed fetches before a crawl gives up.
pub const DEFAULT_EMPTY_PAGE_STOP: u32 = 3;

/// Floor between any two fetches in the same crawl, in milliseconds.
pub const DEFAULT_RATE_LIMIT_MS: u64 = 1500;

/// Candidate links taken from a single page.
pub const DEFAULT_MAX_LINKS_PER_PAGE: usize = 25;

// ---------------------------------------------------------------------------
// Domain risk
// ---------------------------------------------------------------------------

/// Starting per-domain delay for hosts we have no history with.
pub const BASE_DOMAIN_DELAY_MS: u64 = 2000;

/// Ceiling for the per-domain delay.
pub const MAX_DOMAIN_DELAY_MS: u64 = 60_000;

/// Multiplier applied to a domain's delay when friction is detected.
pub const DELAY_RAISE_FACTOR: u64 = 2;

/// Recent HTTP status codes kept per domain for friction detection.
pub const FRICTION_CODE_HISTORY: usize = 16;

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

/// Time-to-live for entries in the in-process result cache.
pub const SCRAPE_CACHE_TTL_SECS: u64 = 24 * 3600;

/// Longer time-to-live for slow-moving identity data (site name, platform).
pub const SCRAPE_CACHE_IDENTITY_TTL_SECS: u64 = 48 * 3600;

/// Capacity of the in-process result cache before low-hit eviction starts.
pub const SCRAPE_CACHE_MAX_ENTRIES: usize = 256;

/// Interval between expired-entry sweeps of the in-process cache.
pub const SCRAPE_CACHE_SWEEP_SECS: u64 = 3600;

/// Hours a persisted URL fingerprint stays valid for change detection.
pub const FETCH_CACHE_FRESH_HOURS: i64 = 24;

/// Hours a persisted ingest result satisfies `cache_check`.
pub const RESULT_FRESHNESS_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Directory under the platform data dir holding engine state.
pub const STORE_DIR_NAME: &str = "orbit-ingest";

/// SQLite database file name.
pub const STORE_FILE_NAME: &str = "orbit_ingest.db";
