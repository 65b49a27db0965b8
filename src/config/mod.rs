//! Configuration types for ingest operations.
//!
//! [`IngestConfig`] covers engine-level concerns (browser, store location),
//! [`CrawlOptions`] is the per-crawl budget, and [`FetchOptions`] tunes a
//! single page fetch. All three are plain data with fluent setters and
//! sensible defaults.

// Sub-modules
pub mod getters;
pub mod types;

// Re-exports for public API
pub use types::{CrawlOptions, FetchOptions, IngestConfig};
