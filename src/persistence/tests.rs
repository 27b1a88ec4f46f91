use serde_json::json;
use tempfile::tempdir;

use super::{MemoryStatusStore, SledStatusStore, StatusRecord, StatusStore};
use crate::broker::{JobStatus, StatusEvent};
use crate::utils::StoreError;

#[tokio::test]
async fn test_sled_record_and_get() {
    let dir = tempdir().unwrap();
    let store = SledStatusStore::open(dir.path().to_str().unwrap(), None).unwrap();

    store.record("job-42", JobStatus::Started, json!(null)).unwrap();
    store
        .record("job-42", JobStatus::Success, json!({"ok": 1}))
        .unwrap();

    let record = store.get_status("job-42").await.unwrap().unwrap();
    assert_eq!(record.job_id, "job-42");
    assert_eq!(record.status, JobStatus::Success);
    assert_eq!(record.result, json!({"ok": 1}));
}

#[tokio::test]
async fn test_sled_unknown_job() {
    let dir = tempdir().unwrap();
    let store = SledStatusStore::open(dir.path().to_str().unwrap(), None).unwrap();
    assert!(store.get_status("job-99").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sled_expired_record_is_unknown() {
    let dir = tempdir().unwrap();
    let store = SledStatusStore::open(dir.path().to_str().unwrap(), Some(60)).unwrap();

    let mut stale = StatusRecord::new("job-old", JobStatus::Failure, json!("boom"));
    stale.updated_at -= 61_000;
    store.put(&stale).unwrap();
    store.record("job-new", JobStatus::Success, json!({})).unwrap();

    assert!(store.get_status("job-old").await.unwrap().is_none());
    assert!(store.load("job-old").unwrap().is_none());
    assert!(store.get_status("job-new").await.unwrap().is_some());
}

#[test]
fn test_sled_rejects_non_positive_ttl() {
    let dir = tempdir().unwrap();
    let path = dir.path().to_str().unwrap();

    for ttl in [0, -1, i64::MIN] {
        match SledStatusStore::open(path, Some(ttl)) {
            Err(StoreError::InvalidTtl(rejected)) => assert_eq!(rejected, ttl),
            other => panic!("Expected InvalidTtl for {ttl}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_sled_huge_ttl_never_expires() {
    let dir = tempdir().unwrap();
    let store = SledStatusStore::open(dir.path().to_str().unwrap(), Some(i64::MAX / 10)).unwrap();

    store.record("job-1", JobStatus::Success, json!(null)).unwrap();
    let mut ancient = StatusRecord::new("job-2", JobStatus::Failure, json!(null));
    ancient.updated_at = i64::MIN;
    store.put(&ancient).unwrap();

    assert!(store.get_status("job-1").await.unwrap().is_some());
    assert!(store.get_status("job-2").await.unwrap().is_some());
}

#[tokio::test]
async fn test_sled_expiry_keeps_newer_write() {
    let dir = tempdir().unwrap();
    let store = SledStatusStore::open(dir.path().to_str().unwrap(), Some(60)).unwrap();

    let mut stale = StatusRecord::new("job-9", JobStatus::Started, json!(null));
    stale.updated_at -= 61_000;
    store.put(&stale).unwrap();
    let seen = store.records.get("job-9").unwrap().unwrap();

    // A producer finishes the job after the stale bytes were read.
    store.record("job-9", JobStatus::Success, json!({"ok": 1})).unwrap();

    assert!(!store.remove_if_unchanged("job-9", &seen).unwrap());
    let record = store.get_status("job-9").await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Success);

    // Unchanged stale bytes are removed.
    store.put(&stale).unwrap();
    let seen = store.records.get("job-9").unwrap().unwrap();
    assert!(store.remove_if_unchanged("job-9", &seen).unwrap());
    assert!(store.get_status("job-9").await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_store() {
    let store = MemoryStatusStore::new();
    assert!(store.get_status("job-1").await.unwrap().is_none());

    store.record("job-1", JobStatus::Started, json!({"step": 1}));
    let record = store.get_status("job-1").await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Started);
}

#[test]
fn test_record_into_event_drops_timestamp() {
    let record = StatusRecord::new("job-1", JobStatus::Success, json!({"ok": 1}));
    let event: StatusEvent = record.into();
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({"job_id": "job-1", "status": "success", "result": {"ok": 1}})
    );
}
