//! Tests for the Store facade
//!
//! These tests verify:
//! - Put/get round-trips across segment sizes
//! - Upsert ordering and free-space reuse
//! - Delete semantics and pool accounting
//! - Persistence across close/reopen
//! - Lifecycle gating and construction validation

use std::fs;
use std::io::Read;
use std::path::Path;

use blockkv::{Config, Store, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_store(dir: &Path, segment_size: u32) -> Store {
    let config = Config::builder()
        .data_dir(dir)
        .segment_size(segment_size)
        .build();
    Store::open(config).unwrap()
}

/// Count segment files ("data<N>") in the working directory
fn segment_file_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name();
            name.to_string_lossy().starts_with("data")
        })
        .count()
}

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_put_get_round_trip() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 4096);

    store.put(b"key", b"value").unwrap();

    assert!(store.contains(b"key").unwrap());
    assert_eq!(store.load_value(b"key").unwrap(), b"value");
}

#[test]
fn test_round_trip_survives_tiny_segments() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 1);

    let value: Vec<u8> = (0u8..=200).collect();
    store.put(b"k", &value).unwrap();

    assert_eq!(store.load_value(b"k").unwrap(), value);
}

#[test]
fn test_empty_value() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 16);

    store.put(b"empty", b"").unwrap();

    assert!(store.contains(b"empty").unwrap());
    assert_eq!(store.load_value(b"empty").unwrap(), b"");
    // No bytes to place, no segment created
    assert_eq!(segment_file_count(temp.path()), 0);
}

#[test]
fn test_empty_key() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 16);

    store.put(b"", b"anonymous").unwrap();

    assert!(store.contains(b"").unwrap());
    assert_eq!(store.load_value(b"").unwrap(), b"anonymous");
}

#[test]
fn test_missing_key_is_not_found() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path(), 16);

    assert!(!store.contains(b"ghost").unwrap());
    assert!(matches!(
        store.load_value(b"ghost"),
        Err(StoreError::KeyNotFound)
    ));
    assert!(matches!(
        store.open_value_stream(b"ghost"),
        Err(StoreError::KeyNotFound)
    ));
}

#[test]
fn test_key_longer_than_255_bytes_rejected() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 16);

    let long_key = vec![7u8; 256];
    assert!(matches!(
        store.put(&long_key, b"v"),
        Err(StoreError::KeyTooLarge(256))
    ));

    // A 255-byte key is the maximum and must work
    let max_key = vec![7u8; 255];
    store.put(&max_key, b"v").unwrap();
    assert_eq!(store.load_value(&max_key).unwrap(), b"v");
}

// =============================================================================
// Segmentation Tests
// =============================================================================

#[test]
fn test_value_split_across_segments() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 3);

    // "hello" with segment size 3 → "hel" in data0, "lo" in data1
    store.put(b"a", b"hello").unwrap();

    assert_eq!(segment_file_count(temp.path()), 2);
    assert_eq!(fs::metadata(temp.path().join("data0")).unwrap().len(), 3);
    assert_eq!(fs::metadata(temp.path().join("data1")).unwrap().len(), 2);
    assert_eq!(store.load_value(b"a").unwrap(), b"hello");
}

#[test]
fn test_segment_count_matches_value_length() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 10);

    // 25 bytes / 10 per segment → 3 segments, last holds 5
    let value = vec![0x42u8; 25];
    store.put(b"k", &value).unwrap();

    assert_eq!(segment_file_count(temp.path()), 3);
    assert_eq!(fs::metadata(temp.path().join("data2")).unwrap().len(), 5);
}

#[test]
fn test_exact_multiple_fills_segments_completely() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 5);

    let value = vec![0x42u8; 10];
    store.put(b"k", &value).unwrap();

    assert_eq!(segment_file_count(temp.path()), 2);
    assert_eq!(fs::metadata(temp.path().join("data0")).unwrap().len(), 5);
    assert_eq!(fs::metadata(temp.path().join("data1")).unwrap().len(), 5);
}

// =============================================================================
// Delete and Reuse Tests
// =============================================================================

#[test]
fn test_delete_frees_exactly_the_value_bytes() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 3);

    store.put(b"a", b"hello").unwrap();
    assert_eq!(store.free_bytes(), 0);

    assert!(store.delete(b"a").unwrap());

    assert!(!store.contains(b"a").unwrap());
    // Two blocks (3 + 2 bytes), kept as separate pool entries
    assert_eq!(store.free_block_count(), 2);
    assert_eq!(store.free_bytes(), 5);
}

#[test]
fn test_delete_absent_key_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 16);

    store.put(b"a", b"value").unwrap();
    store.delete(b"a").unwrap();
    let pool_before = store.free_bytes();

    assert!(!store.delete(b"ghost").unwrap());
    assert_eq!(store.free_bytes(), pool_before);
    assert_eq!(store.key_count(), 0);
}

#[test]
fn test_freed_space_reused_before_new_segments() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 4096);

    store.put(b"a", b"12345").unwrap();
    store.delete(b"a").unwrap();
    assert_eq!(segment_file_count(temp.path()), 1);

    // 3 bytes fit inside the freed 5-byte block; no new segment appears,
    // and the 2-byte remainder stays in the pool
    store.put(b"b", b"xyz").unwrap();

    assert_eq!(segment_file_count(temp.path()), 1);
    assert_eq!(store.free_block_count(), 1);
    assert_eq!(store.free_bytes(), 2);
    assert_eq!(store.load_value(b"b").unwrap(), b"xyz");
}

#[test]
fn test_upsert_reuses_the_vacated_space() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 4096);

    store.put(b"k", b"first").unwrap();
    store.put(b"k", b"again").unwrap();

    // The old 5 bytes were freed before the write and fully reused
    assert_eq!(segment_file_count(temp.path()), 1);
    assert_eq!(store.free_bytes(), 0);
    assert_eq!(store.load_value(b"k").unwrap(), b"again");
}

#[test]
fn test_reuse_spanning_multiple_freed_blocks() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 3);

    store.put(b"a", b"hello").unwrap(); // blocks of 3 + 2
    store.delete(b"a").unwrap();

    // 5 bytes fit exactly into the two freed blocks, whichever order the
    // pool hands them out in
    store.put(b"b", b"world").unwrap();

    assert_eq!(segment_file_count(temp.path()), 2);
    assert_eq!(store.free_bytes(), 0);
    assert_eq!(store.load_value(b"b").unwrap(), b"world");
}

// =============================================================================
// Streaming Tests
// =============================================================================

#[test]
fn test_value_stream_yields_exact_bytes_in_small_reads() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 7);

    let value: Vec<u8> = (0..100u8).collect();
    store.put(b"k", &value).unwrap();

    let mut stream = store.open_value_stream(b"k").unwrap();
    let mut out = Vec::new();
    let mut chunk = [0u8; 5];
    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }

    assert_eq!(out, value);

    // Forward-only and finite: further reads keep returning 0
    assert_eq!(stream.read(&mut chunk).unwrap(), 0);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_persistence_round_trip_across_reopen() {
    let temp = TempDir::new().unwrap();

    let mut store = open_store(temp.path(), 4);
    store.put(b"alpha", b"first value").unwrap();
    store.put(b"beta", b"second").unwrap();
    store.put(b"gone", b"deleted soon").unwrap();
    store.delete(b"gone").unwrap();
    let free_bytes = store.free_bytes();
    store.close().unwrap();

    let store = open_store(temp.path(), 4);
    assert_eq!(store.load_value(b"alpha").unwrap(), b"first value");
    assert_eq!(store.load_value(b"beta").unwrap(), b"second");
    assert!(!store.contains(b"gone").unwrap());
    assert_eq!(store.free_bytes(), free_bytes);
}

#[test]
fn test_working_directory_can_be_relocated() {
    let parent = TempDir::new().unwrap();
    let old_dir = parent.path().join("old");
    fs::create_dir(&old_dir).unwrap();

    let mut store = open_store(&old_dir, 3);
    store.put(b"k", b"movable bytes").unwrap();
    store.close().unwrap();

    // Segment names are stored relative to the working directory, so the
    // whole directory can move between runs
    let new_dir = parent.path().join("new");
    fs::rename(&old_dir, &new_dir).unwrap();

    let store = open_store(&new_dir, 3);
    assert_eq!(store.load_value(b"k").unwrap(), b"movable bytes");
}

#[test]
fn test_reopen_continues_segment_numbering() {
    let temp = TempDir::new().unwrap();

    let mut store = open_store(temp.path(), 4);
    store.put(b"a", b"12345678").unwrap(); // data0, data1
    store.close().unwrap();

    let mut store = open_store(temp.path(), 4);
    store.put(b"b", b"wxyz").unwrap();

    // New data goes to data2, not back over data0
    assert!(temp.path().join("data2").exists());
    assert_eq!(store.load_value(b"a").unwrap(), b"12345678");
    assert_eq!(store.load_value(b"b").unwrap(), b"wxyz");
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_operations_fail_after_close() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 16);

    store.put(b"k", b"v").unwrap();
    store.close().unwrap();
    assert!(store.is_closed());

    assert!(matches!(store.contains(b"k"), Err(StoreError::Closed)));
    assert!(matches!(store.load_value(b"k"), Err(StoreError::Closed)));
    assert!(matches!(
        store.open_value_stream(b"k"),
        Err(StoreError::Closed)
    ));
    assert!(matches!(store.put(b"k", b"v"), Err(StoreError::Closed)));
    assert!(matches!(store.delete(b"k"), Err(StoreError::Closed)));
}

#[test]
fn test_close_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(temp.path(), 16);

    store.put(b"k", b"v").unwrap();
    store.close().unwrap();
    store.close().unwrap();

    // State persisted by the first close survives the second
    let store = open_store(temp.path(), 16);
    assert_eq!(store.load_value(b"k").unwrap(), b"v");
}

// =============================================================================
// Construction Validation Tests
// =============================================================================

#[test]
fn test_open_rejects_missing_directory() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path().join("does-not-exist"))
        .segment_size(16)
        .build();

    assert!(matches!(Store::open(config), Err(StoreError::Config(_))));
}

#[test]
fn test_open_rejects_file_as_directory() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("plain-file");
    fs::write(&file_path, b"not a dir").unwrap();

    let config = Config::builder()
        .data_dir(&file_path)
        .segment_size(16)
        .build();

    assert!(matches!(Store::open(config), Err(StoreError::Config(_))));
}

#[test]
fn test_open_rejects_zero_segment_size() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .segment_size(0)
        .build();

    assert!(matches!(Store::open(config), Err(StoreError::Config(_))));
}
