//! Ingest runs: one crawl, one report, one persisted result.

mod report;
mod service;

pub use report::{CrawlReport, IngestCacheStatus, OrbitIngestResult};
pub use service::IngestService;
