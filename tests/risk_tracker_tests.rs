//! Risk records survive tracker restarts through the SQLite store.

use std::time::Duration;

use tempfile::TempDir;

use orbit_ingest::fetch::OutcomeKind;
use orbit_ingest::risk::DomainRiskTracker;
use orbit_ingest::store;

#[tokio::test]
async fn friction_state_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let pool = store::open(&dir.path().join("risk.db")).await.unwrap();

    let tracker = DomainRiskTracker::new(pool.clone());
    tracker
        .record_outcome("shop.example", OutcomeKind::Blocked, Some(403))
        .await;
    tracker
        .record_outcome("shop.example", OutcomeKind::Blocked, Some(403))
        .await;
    assert_eq!(
        tracker.get_delay("shop.example").await,
        Duration::from_millis(8000)
    );
    drop(tracker);

    let reopened = DomainRiskTracker::new(pool);
    assert_eq!(
        reopened.get_delay("shop.example").await,
        Duration::from_millis(8000)
    );
    let record = reopened.record("shop.example").await.unwrap();
    assert_eq!(record.friction_count, 2);
    assert_eq!(record.failure_count, 2);
    assert_eq!(record.last_friction_codes, vec![403, 403]);
    assert_eq!(record.last_outcome, Some(OutcomeKind::Blocked));
    assert!(record.last_attempt_at.is_some());
    assert!(record.last_success_at.is_none());
}

#[tokio::test]
async fn later_success_never_lowers_a_persisted_delay() {
    let dir = TempDir::new().unwrap();
    let pool = store::open(&dir.path().join("risk.db")).await.unwrap();

    let tracker = DomainRiskTracker::new(pool.clone());
    tracker
        .record_outcome("slow.example", OutcomeKind::Blocked, Some(429))
        .await;
    drop(tracker);

    let reopened = DomainRiskTracker::new(pool);
    reopened
        .record_outcome("slow.example", OutcomeKind::Ok, Some(200))
        .await;

    assert_eq!(
        reopened.get_delay("slow.example").await,
        Duration::from_millis(4000)
    );
    let record = reopened.record("slow.example").await.unwrap();
    assert_eq!(record.success_count, 1);
    assert_eq!(record.friction_count, 1);
    assert!(record.last_success_at.is_some());
}

#[tokio::test]
async fn www_and_case_collapse_to_one_persisted_record() {
    let dir = TempDir::new().unwrap();
    let pool = store::open(&dir.path().join("risk.db")).await.unwrap();

    let tracker = DomainRiskTracker::new(pool.clone());
    tracker
        .record_outcome("WWW.Shop.Example", OutcomeKind::Blocked, Some(403))
        .await;
    drop(tracker);

    let reopened = DomainRiskTracker::new(pool);
    assert_eq!(
        reopened.get_delay("shop.example").await,
        Duration::from_millis(4000)
    );
    let record = reopened.record("www.shop.example").await.unwrap();
    assert_eq!(record.hostname, "shop.example");
}

#[tokio::test]
async fn unknown_hostnames_read_the_base_delay_from_an_empty_store() {
    let dir = TempDir::new().unwrap();
    let pool = store::open(&dir.path().join("risk.db")).await.unwrap();

    let tracker = DomainRiskTracker::new(pool);
    assert_eq!(
        tracker.get_delay("never-seen.example").await,
        Duration::from_millis(2000)
    );
}
