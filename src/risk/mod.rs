//! Adaptive per-hostname crawl politeness.
//!
//! Every fetch outcome feeds a per-hostname record. A block, or a repeated
//! run of server errors and timeouts, doubles the recommended delay up to a
//! ceiling; success never lowers it. Under-throttling a hostile site costs
//! more than over-throttling a friendly one, so the ratchet only goes up.
//! Records are written through to the engine store so a site that pushed
//! back yesterday is still approached slowly today.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::Result;
use crate::fetch::OutcomeKind;
use crate::util::constants::{
    BASE_DOMAIN_DELAY_MS, DELAY_RAISE_FACTOR, FRICTION_CODE_HISTORY, MAX_DOMAIN_DELAY_MS,
};
use crate::util::urls::strip_www;

/// Risk state for one hostname.
#[derive(Debug, Clone)]
pub struct DomainRiskRecord {
    /// Normalized hostname (lowercased, `www.` stripped).
    pub hostname: String,
    /// Minimum delay before the next fetch against this hostname.
    pub recommended_delay_ms: u64,
    /// Friction events observed (blocks, repeated timeouts/server errors).
    pub friction_count: u32,
    /// Fetches that produced usable content.
    pub success_count: u32,
    /// Fetches that did not.
    pub failure_count: u32,
    /// Outcome of the most recent attempt.
    pub last_outcome: Option<OutcomeKind>,
    /// Recent HTTP codes seen on friction events, newest last.
    pub last_friction_codes: Vec<u16>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl DomainRiskRecord {
    fn new(hostname: String) -> Self {
        Self {
            hostname,
            recommended_delay_ms: BASE_DOMAIN_DELAY_MS,
            friction_count: 0,
            success_count: 0,
            failure_count: 0,
            last_outcome: None,
            last_friction_codes: Vec::new(),
            last_attempt_at: None,
            last_success_at: None,
        }
    }

    /// Whether `kind` counts as friction given the previous outcome.
    ///
    /// Blocks always do. Server errors and timeouts only when the previous
    /// attempt also ended in one, so a single flaky response does not slow
    /// a whole crawl.
    fn is_friction(&self, kind: OutcomeKind) -> bool {
        match kind {
            OutcomeKind::Blocked => true,
            OutcomeKind::ServerError | OutcomeKind::Timeout => matches!(
                self.last_outcome,
                Some(OutcomeKind::ServerError | OutcomeKind::Timeout)
            ),
            _ => false,
        }
    }

    fn apply_outcome(&mut self, kind: OutcomeKind, http_status: Option<u16>) {
        let now = Utc::now();
        self.last_attempt_at = Some(now);

        if self.is_friction(kind) {
            self.friction_count += 1;
            self.recommended_delay_ms =
                (self.recommended_delay_ms * DELAY_RAISE_FACTOR).min(MAX_DOMAIN_DELAY_MS);
            if let Some(code) = http_status {
                self.push_friction_code(code);
            }
        }

        if kind == OutcomeKind::Ok {
            self.success_count += 1;
            self.last_success_at = Some(now);
        } else {
            self.failure_count += 1;
        }

        self.last_outcome = Some(kind);
    }

    fn push_friction_code(&mut self, code: u16) {
        self.last_friction_codes.push(code);
        if self.last_friction_codes.len() > FRICTION_CODE_HISTORY {
            let excess = self.last_friction_codes.len() - FRICTION_CODE_HISTORY;
            self.last_friction_codes.drain(..excess);
        }
    }
}

/// Tracks crawl friction per hostname.
///
/// Hot state lives in a [`DashMap`]; each mutation is written through to
/// the store, and unknown hostnames are loaded from it on first touch. A
/// tracker built with [`DomainRiskTracker::new_in_memory`] skips
/// persistence entirely.
pub struct DomainRiskTracker {
    records: DashMap<String, DomainRiskRecord>,
    pool: Option<SqlitePool>,
}

impl DomainRiskTracker {
    /// Tracker backed by the engine store.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            records: DashMap::new(),
            pool: Some(pool),
        }
    }

    /// Tracker with no persistence; state lives for the process only.
    #[must_use]
    pub fn new_in_memory() -> Self {
        Self {
            records: DashMap::new(),
            pool: None,
        }
    }

    /// Recommended delay before the next fetch against `hostname`.
    ///
    /// Hostnames with no history get the base delay.
    pub async fn get_delay(&self, hostname: &str) -> Duration {
        let key = normalize_hostname(hostname);
        self.ensure_loaded(&key).await;
        let delay_ms = self
            .records
            .get(&key)
            .map_or(BASE_DOMAIN_DELAY_MS, |r| r.recommended_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Fold one fetch outcome into the hostname's record.
    pub async fn record_outcome(
        &self,
        hostname: &str,
        kind: OutcomeKind,
        http_status: Option<u16>,
    ) {
        let key = normalize_hostname(hostname);
        self.ensure_loaded(&key).await;

        // Mutate under the entry guard, then persist from a snapshot. No
        // await may happen while the guard is held.
        let snapshot = {
            let mut record = self
                .records
                .entry(key.clone())
                .or_insert_with(|| DomainRiskRecord::new(key.clone()));
            record.apply_outcome(kind, http_status);
            record.value().clone()
        };

        debug!(
            hostname = %snapshot.hostname,
            outcome = %kind,
            delay_ms = snapshot.recommended_delay_ms,
            "recorded fetch outcome"
        );

        if let Err(e) = self.persist(&snapshot).await {
            warn!(hostname = %snapshot.hostname, error = %e, "failed to persist risk record");
        }
    }

    /// Current record for a hostname, if one exists.
    pub async fn record(&self, hostname: &str) -> Option<DomainRiskRecord> {
        let key = normalize_hostname(hostname);
        self.ensure_loaded(&key).await;
        self.records.get(&key).map(|r| r.value().clone())
    }

    /// Pull a hostname's record out of the store on first touch.
    async fn ensure_loaded(&self, key: &str) {
        if self.records.contains_key(key) {
            return;
        }
        let Some(pool) = &self.pool else { return };
        match load_record(pool, key).await {
            Ok(Some(record)) => {
                // A concurrent writer wins; or_insert keeps the newer state.
                self.records.entry(key.to_string()).or_insert(record);
            }
            Ok(None) => {}
            Err(e) => warn!(hostname = key, error = %e, "failed to load risk record"),
        }
    }

    async fn persist(&self, record: &DomainRiskRecord) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        persist_record(pool, record).await
    }
}

fn normalize_hostname(hostname: &str) -> String {
    strip_www(&hostname.to_ascii_lowercase()).to_string()
}

async fn load_record(pool: &SqlitePool, hostname: &str) -> Result<Option<DomainRiskRecord>> {
    type Row = (
        i64,
        i64,
        i64,
        i64,
        Option<String>,
        String,
        Option<i64>,
        Option<i64>,
    );
    let row: Option<Row> = sqlx::query_as(
        "SELECT recommended_delay_ms, friction_count, success_count, failure_count, \
                last_outcome, last_friction_codes, last_attempt_at, last_success_at \
         FROM domain_risk WHERE hostname = ?",
    )
    .bind(hostname)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(delay, friction, success, failure, outcome, codes, attempted, succeeded)| {
            DomainRiskRecord {
                hostname: hostname.to_string(),
                recommended_delay_ms: u64::try_from(delay).unwrap_or(BASE_DOMAIN_DELAY_MS),
                friction_count: u32::try_from(friction).unwrap_or(u32::MAX),
                success_count: u32::try_from(success).unwrap_or(u32::MAX),
                failure_count: u32::try_from(failure).unwrap_or(u32::MAX),
                last_outcome: outcome.as_deref().and_then(OutcomeKind::parse),
                last_friction_codes: serde_json::from_str(&codes).unwrap_or_default(),
                last_attempt_at: attempted.and_then(|s| DateTime::from_timestamp(s, 0)),
                last_success_at: succeeded.and_then(|s| DateTime::from_timestamp(s, 0)),
            }
        },
    ))
}

async fn persist_record(pool: &SqlitePool, record: &DomainRiskRecord) -> Result<()> {
    let codes = serde_json::to_string(&record.last_friction_codes)?;
    sqlx::query(
        "INSERT INTO domain_risk \
             (hostname, recommended_delay_ms, friction_count, success_count, failure_count, \
              last_outcome, last_friction_codes, last_attempt_at, last_success_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(hostname) DO UPDATE SET \
             recommended_delay_ms = excluded.recommended_delay_ms, \
             friction_count = excluded.friction_count, \
             success_count = excluded.success_count, \
             failure_count = excluded.failure_count, \
             last_outcome = excluded.last_outcome, \
             last_friction_codes = excluded.last_friction_codes, \
             last_attempt_at = excluded.last_attempt_at, \
             last_success_at = excluded.last_success_at",
    )
    .bind(&record.hostname)
    .bind(i64::try_from(record.recommended_delay_ms).unwrap_or(i64::MAX))
    .bind(i64::from(record.friction_count))
    .bind(i64::from(record.success_count))
    .bind(i64::from(record.failure_count))
    .bind(record.last_outcome.map(OutcomeKind::as_str))
    .bind(codes)
    .bind(record.last_attempt_at.map(|t| t.timestamp()))
    .bind(record.last_success_at.map(|t| t.timestamp()))
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_hostname_gets_base_delay() {
        let tracker = DomainRiskTracker::new_in_memory();
        assert_eq!(
            tracker.get_delay("example.com").await,
            Duration::from_millis(BASE_DOMAIN_DELAY_MS)
        );
    }

    #[tokio::test]
    async fn block_doubles_delay_immediately() {
        let tracker = DomainRiskTracker::new_in_memory();
        tracker
            .record_outcome("example.com", OutcomeKind::Blocked, Some(403))
            .await;
        assert_eq!(
            tracker.get_delay("example.com").await,
            Duration::from_millis(BASE_DOMAIN_DELAY_MS * 2)
        );

        let record = tracker.record("example.com").await.unwrap();
        assert_eq!(record.friction_count, 1);
        assert_eq!(record.last_friction_codes, vec![403]);
    }

    #[tokio::test]
    async fn delay_stops_at_ceiling() {
        let tracker = DomainRiskTracker::new_in_memory();
        for _ in 0..12 {
            tracker
                .record_outcome("example.com", OutcomeKind::Blocked, Some(403))
                .await;
        }
        assert_eq!(
            tracker.get_delay("example.com").await,
            Duration::from_millis(MAX_DOMAIN_DELAY_MS)
        );
    }

    #[tokio::test]
    async fn single_server_error_is_not_friction() {
        let tracker = DomainRiskTracker::new_in_memory();
        tracker
            .record_outcome("example.com", OutcomeKind::ServerError, Some(500))
            .await;
        assert_eq!(
            tracker.get_delay("example.com").await,
            Duration::from_millis(BASE_DOMAIN_DELAY_MS)
        );

        // The second one in a row is.
        tracker
            .record_outcome("example.com", OutcomeKind::Timeout, None)
            .await;
        assert_eq!(
            tracker.get_delay("example.com").await,
            Duration::from_millis(BASE_DOMAIN_DELAY_MS * 2)
        );
    }

    #[tokio::test]
    async fn success_breaks_a_friction_run_but_keeps_the_delay() {
        let tracker = DomainRiskTracker::new_in_memory();
        tracker
            .record_outcome("example.com", OutcomeKind::Blocked, Some(403))
            .await;
        let raised = tracker.get_delay("example.com").await;

        tracker
            .record_outcome("example.com", OutcomeKind::Ok, Some(200))
            .await;
        assert_eq!(tracker.get_delay("example.com").await, raised);

        // After a success, one server error is a fresh start, not a repeat.
        tracker
            .record_outcome("example.com", OutcomeKind::ServerError, Some(502))
            .await;
        assert_eq!(tracker.get_delay("example.com").await, raised);

        let record = tracker.record("example.com").await.unwrap();
        assert_eq!(record.success_count, 1);
        assert_eq!(record.failure_count, 2);
        assert!(record.last_success_at.is_some());
    }

    #[tokio::test]
    async fn friction_code_history_is_bounded() {
        let tracker = DomainRiskTracker::new_in_memory();
        for i in 0..(FRICTION_CODE_HISTORY + 5) {
            let code = if i % 2 == 0 { 403 } else { 429 };
            tracker
                .record_outcome("example.com", OutcomeKind::Blocked, Some(code))
                .await;
        }
        let record = tracker.record("example.com").await.unwrap();
        assert_eq!(record.last_friction_codes.len(), FRICTION_CODE_HISTORY);
    }

    #[tokio::test]
    async fn hostnames_normalize_to_one_record() {
        let tracker = DomainRiskTracker::new_in_memory();
        tracker
            .record_outcome("WWW.Example.COM", OutcomeKind::Blocked, Some(403))
            .await;
        let record = tracker.record("example.com").await.unwrap();
        assert_eq!(record.hostname, "example.com");
        assert_eq!(record.friction_count, 1);
    }
}
