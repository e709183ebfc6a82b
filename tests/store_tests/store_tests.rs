//! Tests for the byte stores
//!
//! These tests verify:
//! - Positioned reads and writes
//! - Growth with zero fill
//! - Reads past the end fail instead of inventing bytes
//! - FileStore persistence across reopen

use std::io::ErrorKind;
use std::path::PathBuf;

use recstore::{ByteStore, FileStore, MemoryStore, RecStoreError, SyncStrategy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.db");
    (temp_dir, path)
}

fn assert_eof(result: recstore::Result<()>) {
    match result {
        Err(RecStoreError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("expected UnexpectedEof, got {:?}", other),
    }
}

/// Behaviour every store must share
fn exercise_store(store: &dyn ByteStore) {
    assert_eq!(store.size().unwrap(), 0);

    store.set_len(256).unwrap();
    assert_eq!(store.size().unwrap(), 256);

    let mut buf = [0xFFu8; 16];
    store.read_at(240, &mut buf).unwrap();
    assert_eq!(buf, [0u8; 16]);

    store.write_at(100, b"hello").unwrap();
    let mut buf = [0u8; 5];
    store.read_at(100, &mut buf).unwrap();
    assert_eq!(&buf, b"hello");

    assert_eof(store.read_at(250, &mut [0u8; 16]));

    // set_len never shrinks
    store.set_len(128).unwrap();
    assert_eq!(store.size().unwrap(), 256);

    store.sync().unwrap();
}

// =============================================================================
// MemoryStore Tests
// =============================================================================

#[test]
fn test_memory_store_basic_operations() {
    let store = MemoryStore::new();
    exercise_store(&store);
}

#[test]
fn test_memory_store_write_past_end_grows() {
    let store = MemoryStore::new();

    store.write_at(10, b"abc").unwrap();

    assert_eq!(store.size().unwrap(), 13);
    assert_eq!(&store.to_bytes()[10..], b"abc");
    assert_eq!(&store.to_bytes()[..10], &[0u8; 10]);
}

#[test]
fn test_memory_store_from_bytes() {
    let store = MemoryStore::from_bytes(vec![1, 2, 3, 4]);

    let mut buf = [0u8; 2];
    store.read_at(2, &mut buf).unwrap();

    assert_eq!(buf, [3, 4]);
    assert_eq!(store.size().unwrap(), 4);
}

#[test]
fn test_memory_store_empty_read_at_end() {
    let store = MemoryStore::from_bytes(vec![0; 8]);

    store.read_at(8, &mut []).unwrap();
    assert_eof(store.read_at(9, &mut []));
}

// =============================================================================
// FileStore Tests
// =============================================================================

#[test]
fn test_file_store_basic_operations() {
    let (_temp, path) = setup_temp_file();
    let store = FileStore::open(&path, SyncStrategy::Manual).unwrap();

    exercise_store(&store);
    assert_eq!(store.path(), path.as_path());
}

#[test]
fn test_file_store_creates_missing_file_and_parents() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("dir").join("store.db");

    assert!(!path.exists());
    let _store = FileStore::open(&path, SyncStrategy::Manual).unwrap();
    assert!(path.exists());
}

#[test]
fn test_file_store_persists_across_reopen() {
    let (_temp, path) = setup_temp_file();

    {
        let store = FileStore::open(&path, SyncStrategy::EveryWrite).unwrap();
        store.set_len(64).unwrap();
        store.write_at(32, b"durable").unwrap();
    }

    let store = FileStore::open(&path, SyncStrategy::Manual).unwrap();
    assert_eq!(store.size().unwrap(), 64);

    let mut buf = [0u8; 7];
    store.read_at(32, &mut buf).unwrap();
    assert_eq!(&buf, b"durable");
}

#[test]
fn test_file_store_open_does_not_truncate() {
    let (_temp, path) = setup_temp_file();
    std::fs::write(&path, vec![7u8; 300]).unwrap();

    let store = FileStore::open(&path, SyncStrategy::Manual).unwrap();

    assert_eq!(store.size().unwrap(), 300);
}

#[test]
fn test_file_store_concurrent_reads() {
    let (_temp, path) = setup_temp_file();
    let store = FileStore::open(&path, SyncStrategy::Manual).unwrap();
    for i in 0..16u8 {
        store.write_at(i as u64 * 64, &[i; 64]).unwrap();
    }

    crossbeam::scope(|s| {
        for t in 0..8usize {
            let store = &store;
            s.spawn(move |_| {
                for round in 0..200usize {
                    let i = ((t + round) % 16) as u8;
                    let mut buf = [0u8; 64];
                    store.read_at(i as u64 * 64, &mut buf).unwrap();
                    assert_eq!(buf, [i; 64]);
                }
            });
        }
    })
    .unwrap();
}
