//! One-call ingest runs: crawl, report, persist, answer freshness checks.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::browser::{BrowserOptions, BrowserSessionManager};
use crate::cache::{ScrapeCache, UrlFetchCache};
use crate::config::IngestConfig;
use crate::crawl::CrawlOrchestrator;
use crate::error::Result;
use crate::fetch::{BrowserPageFetcher, PageFetchResult};
use crate::risk::DomainRiskTracker;
use crate::store;
use crate::util::constants::{RESULT_FRESHNESS_HOURS, SCRAPE_CACHE_MAX_ENTRIES};
use crate::util::urls::page_key;

use super::report::{CrawlReport, IngestCacheStatus, OrbitIngestResult};

/// Front door of the engine: owns the store, the browser session, and the
/// crawl stack, and persists one [`OrbitIngestResult`] per run.
pub struct IngestService {
    config: IngestConfig,
    pool: SqlitePool,
    session: BrowserSessionManager,
    orchestrator: CrawlOrchestrator<BrowserPageFetcher>,
}

impl IngestService {
    /// Open the store and wire the fetch stack.
    ///
    /// The browser itself is not launched here; the first ingest does that.
    pub async fn new(config: IngestConfig) -> Result<Self> {
        let store_path = config
            .store_path()
            .map(Path::to_path_buf)
            .unwrap_or_else(store::default_path);
        let pool = store::open(&store_path).await?;

        let mut browser = BrowserOptions::default().with_headed(config.headed());
        if let Some(path) = config.chrome_executable() {
            browser = browser.with_executable(path.to_path_buf());
        }
        if let Some(dir) = config.user_data_dir() {
            browser = browser.with_profile_dir(dir.to_path_buf());
        }
        let session = BrowserSessionManager::new(browser);

        let result_cache: Arc<ScrapeCache<PageFetchResult>> =
            Arc::new(ScrapeCache::new(SCRAPE_CACHE_MAX_ENTRIES));
        result_cache.start_sweeper();

        let fetcher = BrowserPageFetcher::new(session.clone())
            .with_result_cache(Arc::clone(&result_cache))
            .with_fingerprints(Arc::new(UrlFetchCache::new(pool.clone())));

        let risk = Arc::new(DomainRiskTracker::new(pool.clone()));
        let orchestrator = CrawlOrchestrator::new(fetcher, risk);

        Ok(Self {
            config,
            pool,
            session,
            orchestrator,
        })
    }

    /// Crawl from `seed_url` and persist the aggregate result.
    ///
    /// `tiles` is the downstream extraction stage's output for this run,
    /// stored untouched alongside the pages so one id recalls the whole run.
    pub async fn ingest(&self, seed_url: &str, tiles: Vec<Value>) -> Result<OrbitIngestResult> {
        let started = Instant::now();
        let crawl = self
            .orchestrator
            .crawl(seed_url, self.config.crawl())
            .await?;
        let report = CrawlReport::from_crawl(&crawl, started.elapsed().as_millis() as u64);

        let result = OrbitIngestResult {
            id: Uuid::new_v4(),
            seed_url: seed_url.to_string(),
            pages: crawl.pages,
            tiles,
            report,
            created_at: Utc::now(),
        };
        self.persist(&result).await?;
        info!(
            id = %result.id,
            seed = seed_url,
            pages = result.pages.len(),
            coverage = result.report.coverage,
            "ingest persisted"
        );
        Ok(result)
    }

    /// Check whether `url` was ingested recently enough to skip a re-crawl.
    ///
    /// `freshness` defaults to 24 hours. The check keys on the normalized
    /// page identity, so query strings and trailing slashes do not split
    /// the history.
    pub async fn cache_check(
        &self,
        url: &str,
        freshness: Option<Duration>,
    ) -> Result<IngestCacheStatus> {
        let key = page_key(url)?;
        let window = freshness
            .unwrap_or_else(|| Duration::from_secs(RESULT_FRESHNESS_HOURS as u64 * 3600));

        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT id, created_at FROM ingest_results \
             WHERE seed_key = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&key)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, created_at)) = row else {
            debug!(url, "no prior ingest");
            return Ok(IngestCacheStatus {
                exists: false,
                fresh: false,
                ingestion_id: None,
                age_secs: None,
            });
        };

        let age_secs = u64::try_from(Utc::now().timestamp() - created_at).unwrap_or(0);
        Ok(IngestCacheStatus {
            exists: true,
            fresh: Duration::from_secs(age_secs) < window,
            ingestion_id: Uuid::parse_str(&id).ok(),
            age_secs: Some(age_secs),
        })
    }

    /// Load a persisted ingest run by id.
    pub async fn result(&self, id: Uuid) -> Result<Option<OrbitIngestResult>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM ingest_results WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((payload,)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Close the browser process. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        self.session.shutdown().await
    }

    async fn persist(&self, result: &OrbitIngestResult) -> Result<()> {
        let payload = serde_json::to_string(result)?;
        sqlx::query(
            "INSERT INTO ingest_results (id, seed_key, payload, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(result.id.to_string())
        .bind(page_key(&result.seed_url)?)
        .bind(payload)
        .bind(result.created_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
