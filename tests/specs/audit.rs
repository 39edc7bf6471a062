//! Audit-trail specs
//!
//! Verify the persisted acquisition record over a full life cycle.

use semgate_adapters::MemoryStore;
use semgate_client::{AcquireError, SemaphoreClient};
use semgate_core::profile::ConnectionProfile;
use semgate_core::FakeClock;

#[tokio::test]
async fn completed_lifecycle_orders_all_three_timestamps() {
    let store = MemoryStore::new();
    store.register("batch", 1);
    let clock = FakeClock::new();
    let client =
        SemaphoreClient::with_clock(store.clone(), ConnectionProfile::default(), clock.clone());

    let mut guard = client.acquire("batch", "task-1").await.unwrap();
    clock.advance(chrono::Duration::seconds(4));
    guard.release().await;

    let row = store.committed_request(guard.request_id()).unwrap();
    assert!(row.is_consistent());
    let grant = row.grant_time.unwrap();
    let release = row.release_time.unwrap();
    assert!(row.request_time <= grant);
    assert!(grant < release);
}

#[tokio::test]
async fn not_found_leaves_no_trace() {
    let store = MemoryStore::new();
    store.register("batch", 1);
    let client = SemaphoreClient::new(store.clone(), ConnectionProfile::default());

    let err = client.acquire("other", "task-1").await.unwrap_err();
    assert!(matches!(err, AcquireError::NotFound(_)));
    assert!(store.committed_requests().is_empty());
    assert_eq!(store.open_session_count(), 0);
}

#[tokio::test]
async fn audit_rows_are_retained_after_release() {
    let store = MemoryStore::new();
    store.register("batch", 2);
    let client = SemaphoreClient::new(store.clone(), ConnectionProfile::default());

    let mut first = client.acquire("batch", "task-1").await.unwrap();
    first.release().await;
    let mut second = client.acquire("batch", "task-2").await.unwrap();
    second.release().await;

    // Rows are never deleted by the client: both lifecycles remain
    let rows = store.committed_requests();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.is_released()));
}
