//! Connection profile specs
//!
//! Verify a client can be configured from a services file section.

use semgate_adapters::MemoryStore;
use semgate_client::SemaphoreClient;
use semgate_core::profile::ConnectionProfile;
use std::io::Write;

const SERVICES: &str = r#"
[coordination-prod]
user = "worker"
host = "store.internal"
port = 5432
service = "semaphores"

[coordination-local]
user = "dev"
"#;

#[tokio::test]
async fn client_uses_a_profile_loaded_from_a_services_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SERVICES.as_bytes()).unwrap();

    let profile = ConnectionProfile::from_file(file.path(), "coordination-prod").unwrap();
    assert_eq!(profile.user.as_deref(), Some("worker"));
    assert_eq!(profile.service.as_deref(), Some("semaphores"));

    let store = MemoryStore::new();
    store.register("batch", 1);
    let client = SemaphoreClient::new(store.clone(), profile);

    let mut guard = client.acquire("batch", "task-1").await.unwrap();
    assert_eq!(guard.slot(), 1);
    guard.release().await;
    assert_eq!(store.available_slots("batch"), Some(1));
}

#[tokio::test]
async fn unknown_section_is_rejected_before_any_connection() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SERVICES.as_bytes()).unwrap();

    let err = ConnectionProfile::from_file(file.path(), "coordination-staging").unwrap_err();
    assert!(matches!(
        err,
        semgate_core::ProfileError::SectionNotFound { .. }
    ));
}
