//! Life-cycle tests for hyperlog-storage
//!
//! These tests drive disk-backed sessions through create, append, close and
//! reopen, the way separate processes would use the same namespace.

use std::path::Path;

use hyperlog_core::{AppendOutcome, PartialKeypair, SigningKey};
use hyperlog_storage::{LogError, Session, SessionState, Store};
use tempfile::TempDir;

fn key_pair(seed: u8) -> PartialKeypair {
    PartialKeypair::from_signing_key(SigningKey::from_bytes(&[seed; 32]))
}

fn file_sizes(dir: &Path) -> Vec<u64> {
    Store::ALL
        .iter()
        .map(|store| std::fs::metadata(dir.join(store.file_name())).unwrap().len())
        .collect()
}

// ============================================================================
// Interop scenario
// ============================================================================

#[tokio::test]
async fn test_scenario_create_reopen_empty() {
    let tmp = TempDir::new().unwrap();
    let dir = key_pair(1).namespace_in(tmp.path());

    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    let info = session.info().await.unwrap();
    assert_eq!((info.length, info.byte_length), (0, 0));
    session.close().await.unwrap();

    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    let info = session.info().await.unwrap();
    assert_eq!((info.length, info.byte_length), (0, 0));
    assert!(info.writable);
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_scenario_append_across_restarts() {
    let tmp = TempDir::new().unwrap();
    let dir = key_pair(1).namespace_in(tmp.path());

    // Step 1
    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    session.close().await.unwrap();

    // Step 2
    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    let outcome = session.append(&["Hello", "World"]).await.unwrap();
    assert_eq!(outcome, AppendOutcome::new(2, 10));
    session.close().await.unwrap();

    // Step 3
    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    assert_eq!(session.get(0).await.unwrap(), "Hello");
    assert_eq!(session.get(1).await.unwrap(), "World");

    let outcome = session.append_one("first").await.unwrap();
    assert_eq!(outcome, AppendOutcome::new(3, 15));
    let outcome = session.append(&["second", "third"]).await.unwrap();
    assert_eq!(outcome, AppendOutcome::new(5, 26));

    let entries = session.get_batch(2..5).await.unwrap();
    assert_eq!(entries, vec!["first", "second", "third"]);
    session.close().await.unwrap();

    // Everything survives one more restart
    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    let info = session.info().await.unwrap();
    assert_eq!((info.length, info.byte_length), (5, 26));
    let all = session.get_batch(0..5).await.unwrap();
    assert_eq!(all, vec!["Hello", "World", "first", "second", "third"]);
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_open_in_uses_key_namespace() {
    let tmp = TempDir::new().unwrap();
    let session = Session::open_in(tmp.path(), key_pair(3)).await.unwrap();

    let expected = tmp.path().join(hex::encode(key_pair(3).public_bytes()));
    assert_eq!(session.location(), Some(expected.as_path()));
    session.close().await.unwrap();
}

// ============================================================================
// Identity
// ============================================================================

#[tokio::test]
async fn test_other_key_is_rejected_without_mutation() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("log");

    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    session.append(&["Hello", "World"]).await.unwrap();
    session.close().await.unwrap();
    let before = file_sizes(&dir);

    let err = Session::open_disk(&dir, key_pair(2)).await.unwrap_err();
    assert!(matches!(err, LogError::IdentityMismatch(_)));
    assert_eq!(file_sizes(&dir), before);

    // The rightful owner still sees the same log
    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    assert_eq!(session.info().await.unwrap().length, 2);
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_read_only_reopen() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("log");

    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    session.append(&["Hello"]).await.unwrap();
    session.close().await.unwrap();

    let reader = Session::open_disk(&dir, key_pair(1).to_read_only())
        .await
        .unwrap();
    let info = reader.info().await.unwrap();
    assert!(!info.writable);
    assert_eq!(reader.get(0).await.unwrap(), "Hello");
    assert!(matches!(
        reader.append(&["nope"]).await,
        Err(LogError::ReadOnly)
    ));
    reader.close().await.unwrap();
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_second_open_conflicts() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("log");

    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    let err = Session::open_disk(&dir, key_pair(1)).await.unwrap_err();
    assert!(matches!(err, LogError::ConcurrentWriterConflict(_)));
    assert_eq!(session.state().await, SessionState::Open);

    session.close().await.unwrap();
    let session = Session::open_disk(&dir, key_pair(1)).await.unwrap();
    session.close().await.unwrap();
}
