//! Crawl reporting and the persisted ingest aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::crawl::{CrawlResult, PageError, StopReason};
use crate::fetch::PageFetchResult;

/// Quality summary of one crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub pages_attempted: usize,
    pub pages_succeeded: usize,
    pub errors: Vec<PageError>,
    pub duration_ms: u64,
    /// Fraction of attempts that yielded content. Zero when nothing was
    /// attempted.
    pub coverage: f64,
    pub stopped_reason: StopReason,
}

impl CrawlReport {
    /// Summarize a finished crawl.
    #[must_use]
    pub fn from_crawl(crawl: &CrawlResult, duration_ms: u64) -> Self {
        let attempted = crawl.pages_visited.len();
        let succeeded = crawl.pages.len();
        let coverage = if attempted == 0 {
            0.0
        } else {
            succeeded as f64 / attempted as f64
        };
        Self {
            pages_attempted: attempted,
            pages_succeeded: succeeded,
            errors: crawl.errors.clone(),
            duration_ms,
            coverage,
            stopped_reason: crawl.stopped_reason,
        }
    }
}

/// Persisted output of one ingest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitIngestResult {
    /// Opaque ingestion id handed back to callers.
    pub id: Uuid,
    pub seed_url: String,
    pub pages: Vec<PageFetchResult>,
    /// Extraction-stage payloads, stored untouched alongside the pages.
    pub tiles: Vec<Value>,
    pub report: CrawlReport,
    pub created_at: DateTime<Utc>,
}

/// Answer to "was this URL ingested recently enough to reuse?".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestCacheStatus {
    pub exists: bool,
    pub fresh: bool,
    pub ingestion_id: Option<Uuid>,
    pub age_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchOutcome, OutcomeKind, PageContent};

    fn content_page(url: &str) -> PageFetchResult {
        PageFetchResult::new(
            url,
            url,
            FetchOutcome::Ok(PageContent {
                html: "<html><body>hello</body></html>".into(),
                rendered_text: "hello".into(),
                title: Some("Hello".into()),
                structured_data: Vec::new(),
                platform_embedded: None,
                content_hash: "00aabbccddeeff11".into(),
                http_status: Some(200),
                screenshot: None,
            }),
        )
    }

    fn crawl_with(attempted: usize, succeeded: usize) -> CrawlResult {
        let pages = (0..succeeded)
            .map(|i| content_page(&format!("https://example.com/{i}")))
            .collect();
        CrawlResult {
            pages,
            pages_visited: (0..attempted)
                .map(|i| format!("https://example.com/{i}"))
                .collect(),
            candidates_discovered: Vec::new(),
            errors: vec![PageError {
                url: "https://example.com/x".into(),
                kind: OutcomeKind::Timeout,
                detail: "navigation did not settle".into(),
            }],
            stopped_reason: StopReason::Completed,
        }
    }

    #[test]
    fn coverage_is_succeeded_over_attempted() {
        let report = CrawlReport::from_crawl(&crawl_with(4, 3), 1200);
        assert_eq!(report.pages_attempted, 4);
        assert_eq!(report.pages_succeeded, 3);
        assert!((report.coverage - 0.75).abs() < f64::EPSILON);
        assert_eq!(report.duration_ms, 1200);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn coverage_is_zero_when_nothing_was_attempted() {
        let report = CrawlReport::from_crawl(&crawl_with(0, 0), 5);
        assert_eq!(report.coverage, 0.0);
    }
}
