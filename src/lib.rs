pub mod browser;
pub mod cache;
pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod risk;
pub mod store;
pub mod util;

pub use browser::{BrowserOptions, BrowserSessionManager};
pub use cache::{ChangeStatus, ScrapeCache, UrlFetchCache, UrlFetchCacheEntry, cache_key};
pub use config::{CrawlOptions, FetchOptions, IngestConfig};
pub use crawl::{CrawlOrchestrator, CrawlResult, PageError, StopReason};
pub use error::{IngestError, Result};
pub use fetch::{
    BrowserPageFetcher, FetchOutcome, OutcomeKind, PageContent, PageFetchResult, PageFetcher,
};
pub use ingest::{CrawlReport, IngestCacheStatus, IngestService, OrbitIngestResult};
pub use risk::{DomainRiskRecord, DomainRiskTracker};
pub use util::urls::page_key;

/// Run one ingest end to end: open the engine, crawl from `seed_url`,
/// persist the result, and shut the browser down.
pub async fn ingest(
    config: IngestConfig,
    seed_url: &str,
    tiles: Vec<serde_json::Value>,
) -> Result<OrbitIngestResult> {
    let service = IngestService::new(config).await?;
    let outcome = service.ingest(seed_url, tiles).await;
    service.shutdown().await?;
    outcome
}
