//! Engine state store.
//!
//! One SQLite database holds the three persistent tables: per-hostname risk
//! records, per-URL fetch fingerprints, and completed ingest results. The
//! schema is applied idempotently at pool open, so callers never run a
//! separate migration step. Timestamps are stored as Unix seconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};

use crate::error::Result;
use crate::util::constants::{STORE_DIR_NAME, STORE_FILE_NAME};

const SCHEMA_SQL: &str = r"
-- Per-hostname crawl friction state
CREATE TABLE IF NOT EXISTS domain_risk (
    hostname TEXT PRIMARY KEY,
    recommended_delay_ms INTEGER NOT NULL,
    friction_count INTEGER NOT NULL DEFAULT 0,
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    last_outcome TEXT,
    last_friction_codes TEXT NOT NULL DEFAULT '[]',
    last_attempt_at INTEGER,
    last_success_at INTEGER
);

-- Per-URL content fingerprints for change detection
CREATE TABLE IF NOT EXISTS url_fetch_cache (
    url TEXT PRIMARY KEY,
    content_hash TEXT NOT NULL,
    content_length INTEGER NOT NULL,
    last_http_status INTEGER,
    fetched_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    fetch_count INTEGER NOT NULL DEFAULT 1
);

-- Completed ingest runs, keyed by ingestion id
CREATE TABLE IF NOT EXISTS ingest_results (
    id TEXT PRIMARY KEY,
    seed_key TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- Freshness checks look up the newest run for a seed
CREATE INDEX IF NOT EXISTS idx_ingest_results_seed
    ON ingest_results(seed_key, created_at);
";

/// Open the engine store, creating the database file and schema as needed.
///
/// WAL mode so risk updates during a crawl never block freshness reads.
pub async fn open(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    sqlx::query(SCHEMA_SQL).execute(&pool).await?;

    Ok(pool)
}

/// Default database location under the platform data directory.
#[must_use]
pub fn default_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(STORE_DIR_NAME)
        .join(STORE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_creates_schema_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.db");

        let pool = open(&path).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM domain_risk")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        pool.close().await;

        // Reopening an existing database must not fail on CREATE statements.
        let pool = open(&path).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingest_results")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        pool.close().await;
    }
}
