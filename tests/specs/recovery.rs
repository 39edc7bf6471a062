//! Connectivity-loss recovery specs
//!
//! Verify the reconnect-dequeue-retry path and the retry budget.

use semgate_adapters::{FlakyStore, MemoryStore, StoreCall};
use semgate_client::{AcquireError, SemaphoreClient};
use semgate_core::profile::ConnectionProfile;
use semgate_core::{FakeClock, RetryPolicy};
use std::time::Duration;

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new().with_retry_interval(Duration::from_millis(1))
}

fn flaky_client(
    store: &FlakyStore<MemoryStore>,
) -> SemaphoreClient<FlakyStore<MemoryStore>, FakeClock> {
    SemaphoreClient::with_clock(store.clone(), ConnectionProfile::default(), FakeClock::new())
        .with_retry_policy(fast_retry())
}

#[tokio::test]
async fn transient_failure_then_success_persists_two_attempts() {
    let inner = MemoryStore::new();
    inner.register("batch", 1);
    let store = FlakyStore::new(inner);
    store.fail_next_waits(1);

    let mut guard = flaky_client(&store)
        .acquire("batch", "task-1")
        .await
        .unwrap();

    let row = store.inner().committed_request(guard.request_id()).unwrap();
    assert_eq!(row.num_requests, 2);
    assert!(row.is_granted());
    guard.release().await;
}

#[tokio::test]
async fn persistent_failure_exhausts_the_budget_and_leaves_evidence() {
    let inner = MemoryStore::new();
    inner.register("batch", 1);
    let store = FlakyStore::new(inner);
    store.fail_all_waits();

    let err = flaky_client(&store)
        .acquire("batch", "task-1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AcquireError::AcquisitionFailed { attempts: 5, .. }
    ));

    let rows = store.inner().committed_requests();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].num_requests, 5);
    assert!(rows[0].grant_time.is_none());
    assert_eq!(store.inner().available_slots("batch"), Some(1));
}

#[tokio::test]
async fn stale_queue_entry_is_swept_before_the_fresh_wait() {
    let inner = MemoryStore::new();
    inner.register("batch", 1);

    // A holder occupies the only slot
    let profile = ConnectionProfile::default();
    let holder_client = SemaphoreClient::new(inner.clone(), profile.clone());
    let mut holder = holder_client.acquire("batch", "holder").await.unwrap();

    // A raw waiter queues, then its process dies without any cleanup
    let doomed = semgate_adapters::SessionProvider::open(&inner, &profile)
        .await
        .unwrap();
    let doomed_wait = {
        let inner = inner.clone();
        let doomed = doomed.clone();
        tokio::spawn(
            async move { semgate_adapters::LockAuthority::wait(&inner, &doomed, "batch").await },
        )
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    inner.kill_session(&doomed);
    assert!(tokio::time::timeout(Duration::from_secs(1), doomed_wait)
        .await
        .unwrap()
        .unwrap()
        .is_err());
    assert_eq!(inner.queued_sessions("batch"), vec![doomed.clone()]);

    // A fresh client whose first attempt fails goes through the
    // reconnect path, whose dequeue sweeps the ghost entry
    let store = FlakyStore::new(inner.clone());
    store.fail_next_waits(1);
    let fresh = {
        let client = flaky_client(&store);
        tokio::spawn(async move { client.acquire("batch", "fresh").await })
    };

    // Wait until the retry has reached its second wait, then confirm
    // the sweep happened in between
    for _ in 0..100 {
        if store.wait_count() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!inner.queued_sessions("batch").contains(&doomed));

    let calls = store.calls();
    let dequeue_pos = calls
        .iter()
        .position(|c| matches!(c, StoreCall::Dequeue { .. }))
        .unwrap();
    let last_wait_pos = calls
        .iter()
        .rposition(|c| matches!(c, StoreCall::Wait { .. }))
        .unwrap();
    assert!(dequeue_pos < last_wait_pos);

    holder.release().await;
    let mut guard = tokio::time::timeout(Duration::from_secs(2), fresh)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    guard.release().await;
}
