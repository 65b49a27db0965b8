//! Persisted per-URL fetch fingerprints.
//!
//! After every content-bearing fetch the rendered HTML's hash is upserted
//! here, keyed by the exact URL. The table answers one question across runs:
//! did this page change since we last rendered it? It never short-circuits a
//! fetch; downstream extraction uses the answer to skip re-processing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::util::constants::FETCH_CACHE_FRESH_HOURS;

/// How a fresh fetch relates to the previous fingerprint of the same URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// No fingerprint on record for this URL.
    FirstSeen,
    /// The content hash differs from the recorded one.
    Changed,
    /// The content hash matches; re-processing can be skipped.
    Unchanged,
}

/// One row of the fingerprint table.
#[derive(Debug, Clone)]
pub struct UrlFetchCacheEntry {
    pub url: String,
    pub content_hash: String,
    pub content_length: i64,
    pub last_http_status: Option<u16>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub fetch_count: i64,
}

impl UrlFetchCacheEntry {
    /// Whether the fingerprint is still inside its freshness window.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Change-detection table over the engine store.
#[derive(Debug, Clone)]
pub struct UrlFetchCache {
    pool: SqlitePool,
}

impl UrlFetchCache {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fingerprint on record for `url`, if any.
    pub async fn lookup(&self, url: &str) -> Result<Option<UrlFetchCacheEntry>> {
        let row: Option<(String, i64, Option<i64>, i64, i64, i64)> = sqlx::query_as(
            "SELECT content_hash, content_length, last_http_status, \
                    fetched_at, expires_at, fetch_count \
             FROM url_fetch_cache WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(content_hash, content_length, status, fetched_at, expires_at, fetch_count)| {
                UrlFetchCacheEntry {
                    url: url.to_string(),
                    content_hash,
                    content_length,
                    last_http_status: status.and_then(|s| u16::try_from(s).ok()),
                    fetched_at: DateTime::from_timestamp(fetched_at, 0)
                        .unwrap_or(DateTime::UNIX_EPOCH),
                    expires_at: DateTime::from_timestamp(expires_at, 0)
                        .unwrap_or(DateTime::UNIX_EPOCH),
                    fetch_count,
                }
            },
        ))
    }

    /// Upsert the fingerprint for a completed fetch and report whether the
    /// content changed since the last one.
    pub async fn record_fetch(
        &self,
        url: &str,
        content_hash: &str,
        content_length: usize,
        http_status: Option<u16>,
    ) -> Result<ChangeStatus> {
        let previous = self.lookup(url).await?;
        let change = match &previous {
            None => ChangeStatus::FirstSeen,
            Some(entry) if entry.content_hash == content_hash => ChangeStatus::Unchanged,
            Some(_) => ChangeStatus::Changed,
        };

        let now = Utc::now();
        let expires = now + chrono::Duration::hours(FETCH_CACHE_FRESH_HOURS);

        sqlx::query(
            "INSERT INTO url_fetch_cache \
                 (url, content_hash, content_length, last_http_status, \
                  fetched_at, expires_at, fetch_count) \
             VALUES (?, ?, ?, ?, ?, ?, 1) \
             ON CONFLICT(url) DO UPDATE SET \
                 content_hash = excluded.content_hash, \
                 content_length = excluded.content_length, \
                 last_http_status = excluded.last_http_status, \
                 fetched_at = excluded.fetched_at, \
                 expires_at = excluded.expires_at, \
                 fetch_count = fetch_count + 1",
        )
        .bind(url)
        .bind(content_hash)
        .bind(i64::try_from(content_length).unwrap_or(i64::MAX))
        .bind(http_status.map(i64::from))
        .bind(now.timestamp())
        .bind(expires.timestamp())
        .execute(&self.pool)
        .await?;

        debug!(url, change = ?change, "recorded fetch fingerprint");
        Ok(change)
    }
}
