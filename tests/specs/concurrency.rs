//! Bounded concurrency specs
//!
//! Verify the pool bound holds across concurrent acquisitions.

use semgate_adapters::MemoryStore;
use semgate_client::SemaphoreClient;
use semgate_core::profile::ConnectionProfile;
use std::time::Duration;

fn client_for(store: &MemoryStore) -> SemaphoreClient<MemoryStore, semgate_core::SystemClock> {
    SemaphoreClient::new(store.clone(), ConnectionProfile::default())
}

#[tokio::test]
async fn acquisitions_within_capacity_all_succeed_with_distinct_slots() {
    let store = MemoryStore::new();
    store.register("batch", 3);

    let mut handles = Vec::new();
    for n in 0..3 {
        let client = client_for(&store);
        handles.push(tokio::spawn(async move {
            client.acquire("batch", &format!("task-{n}")).await
        }));
    }

    let mut guards = Vec::new();
    for handle in handles {
        guards.push(handle.await.unwrap().unwrap());
    }

    let mut slots: Vec<u32> = guards.iter().map(|g| g.slot()).collect();
    slots.sort_unstable();
    assert_eq!(slots, vec![1, 2, 3]);

    for guard in &mut guards {
        guard.release().await;
    }
    assert_eq!(store.available_slots("batch"), Some(3));
}

#[tokio::test]
async fn acquisition_beyond_capacity_blocks_until_a_release() {
    let store = MemoryStore::new();
    store.register("batch", 2);

    let mut first = client_for(&store).acquire("batch", "task-1").await.unwrap();
    let second = client_for(&store).acquire("batch", "task-2").await.unwrap();

    let third = {
        let client = client_for(&store);
        tokio::spawn(async move { client.acquire("batch", "task-3").await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    // The pool bound holds: the third acquisition is still waiting
    assert!(!third.is_finished());
    assert_eq!(store.held_slots("batch").len(), 2);

    first.release().await;
    let mut granted = tokio::time::timeout(Duration::from_secs(2), third)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(granted.slot(), 1);

    granted.release().await;
    let mut second = second;
    second.release().await;
    assert_eq!(store.available_slots("batch"), Some(2));
}
