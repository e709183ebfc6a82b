//! Tests for BlockManager
//!
//! These tests verify:
//! - Layout validation
//! - Block lookup and "no such block" at the end of the store
//! - Whole-block extension and the alignment check
//! - Write-through headers and content bounds
//! - One live handle per block, evicted when released

use std::sync::Arc;

use recstore::block::{BlockHeader, BlockLayout, BlockManager, BlockRef, NO_BLOCK};
use recstore::{ByteStore, MemoryStore, RecStoreError};

// =============================================================================
// Helper Functions
// =============================================================================

fn small_layout() -> BlockLayout {
    BlockLayout::new(128, 48).unwrap()
}

fn setup_manager() -> (Arc<MemoryStore>, BlockManager) {
    let store = Arc::new(MemoryStore::new());
    let manager = BlockManager::new(store.clone(), small_layout());
    (store, manager)
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_layout_content_size() {
    let layout = small_layout();

    assert_eq!(layout.block_size(), 128);
    assert_eq!(layout.header_size(), 48);
    assert_eq!(layout.content_size(), 80);
    assert_eq!(layout.block_offset(3), 384);
    assert_eq!(layout.content_offset(3), 432);
}

#[test]
fn test_layout_default_is_4k_page() {
    let layout = BlockLayout::default();

    assert_eq!(layout.block_size(), 4096);
    assert_eq!(layout.header_size(), 48);
}

#[test]
fn test_layout_rejects_small_block() {
    let result = BlockLayout::new(64, 48);
    assert!(matches!(result, Err(RecStoreError::Config(_))));
}

#[test]
fn test_layout_rejects_header_not_smaller_than_block() {
    assert!(matches!(BlockLayout::new(128, 128), Err(RecStoreError::Config(_))));
    assert!(matches!(BlockLayout::new(128, 200), Err(RecStoreError::Config(_))));
}

#[test]
fn test_layout_rejects_header_too_small_for_fields() {
    assert!(matches!(BlockLayout::new(128, 40), Err(RecStoreError::Config(_))));
    assert!(BlockLayout::new(128, 44).is_ok());
}

#[test]
fn test_layout_large_page() {
    let layout = BlockLayout::new(16384, 48).unwrap();
    assert_eq!(layout.content_size(), 16336);
}

// =============================================================================
// Find / Create Tests
// =============================================================================

#[test]
fn test_find_on_empty_store() {
    let (_store, manager) = setup_manager();

    assert!(manager.find(0).unwrap().is_none());
    assert_eq!(manager.block_count().unwrap(), 0);
}

#[test]
fn test_create_new_assigns_sequential_ids() {
    let (store, manager) = setup_manager();

    let ids: Vec<u32> = (0..3).map(|_| manager.create_new().unwrap().id()).collect();

    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(store.size().unwrap(), 3 * 128);
    assert_eq!(manager.block_count().unwrap(), 3);
}

#[test]
fn test_create_new_returns_zeroed_block() {
    let (_store, manager) = setup_manager();

    let block = manager.create_new().unwrap();

    assert_eq!(block.header(), BlockHeader::default());
    assert!(!block.is_deleted());
    assert_eq!(block.next_block_id(), NO_BLOCK);
    assert_eq!(block.capacity(), 80);
}

#[test]
fn test_find_beyond_end_is_none() {
    let (_store, manager) = setup_manager();
    manager.create_new().unwrap();
    manager.create_new().unwrap();

    assert!(manager.find(1).unwrap().is_some());
    assert!(manager.find(2).unwrap().is_none());
    assert!(manager.find(1000).unwrap().is_none());
}

#[test]
fn test_require_missing_block() {
    let (_store, manager) = setup_manager();

    let result = manager.require(7);

    assert!(matches!(result, Err(RecStoreError::MissingBlock { block_id: 7 })));
}

#[test]
fn test_create_new_rejects_misaligned_store() {
    let store = Arc::new(MemoryStore::from_bytes(vec![0u8; 130]));
    let manager = BlockManager::new(store.clone(), small_layout());

    let result = manager.create_new();

    assert!(matches!(result, Err(RecStoreError::Corruption(_))));
    assert_eq!(store.size().unwrap(), 130);
    assert!(!manager.is_aligned().unwrap());

    // The whole block that does exist is still readable
    assert!(manager.find(0).unwrap().is_some());
    assert!(manager.find(1).unwrap().is_none());
}

#[test]
fn test_find_reads_zero_filled_block_as_default_header() {
    let store = Arc::new(MemoryStore::new());
    store.set_len(256).unwrap();
    let manager = BlockManager::new(store, small_layout());

    let block = manager.find(1).unwrap().unwrap();

    assert_eq!(block.header(), BlockHeader::default());
}

#[test]
fn test_find_detects_damaged_header() {
    let (store, manager) = setup_manager();
    {
        let block = manager.create_new().unwrap();
        block.update_header(|h| h.record_length = 42).unwrap();
    }

    // Flip a byte inside the record_length slot
    store.write_at(9, &[0xAB]).unwrap();

    let err = manager.find(0).unwrap_err();
    assert!(err.is_corruption());
}

// =============================================================================
// Header and Content Tests
// =============================================================================

#[test]
fn test_header_is_written_through() {
    let (store, manager) = setup_manager();
    {
        let block = manager.create_new().unwrap();
        block
            .update_header(|h| {
                h.next_block_id = 5;
                h.record_length = 300;
                h.block_content_length = 80;
                h.previous_block_id = 2;
            })
            .unwrap();
    }

    // A second manager only sees what reached the store
    let other = BlockManager::new(store, small_layout());
    let header = other.find(0).unwrap().unwrap().header();

    assert_eq!(header.next_block_id, 5);
    assert_eq!(header.record_length, 300);
    assert_eq!(header.block_content_length, 80);
    assert_eq!(header.previous_block_id, 2);
    assert!(!header.is_deleted);
}

#[test]
fn test_reset_clears_header() {
    let (_store, manager) = setup_manager();
    let block = manager.create_new().unwrap();
    block
        .update_header(|h| {
            h.next_block_id = 9;
            h.is_deleted = true;
        })
        .unwrap();

    block.reset().unwrap();

    assert_eq!(block.header(), BlockHeader::default());
}

#[test]
fn test_content_round_trip() {
    let (_store, manager) = setup_manager();
    manager.create_new().unwrap();
    let block = manager.create_new().unwrap();

    block.write_content(10, b"payload").unwrap();
    let mut buf = [0u8; 7];
    block.read_content(10, &mut buf).unwrap();

    assert_eq!(&buf, b"payload");
}

#[test]
fn test_content_write_does_not_touch_header() {
    let (_store, manager) = setup_manager();
    let block = manager.create_new().unwrap();
    block.update_header(|h| h.record_length = 11).unwrap();

    block.write_content(0, &[0xFF; 80]).unwrap();
    drop(block);

    let block = manager.find(0).unwrap().unwrap();
    assert_eq!(block.record_length(), 11);
}

#[test]
fn test_content_bounds_are_enforced() {
    let (_store, manager) = setup_manager();
    let block = manager.create_new().unwrap();

    let write = block.write_content(70, &[0u8; 20]);
    assert!(matches!(write, Err(RecStoreError::ContentOverflow { .. })));

    let read = block.read_content(81, &mut [0u8; 1]);
    assert!(matches!(read, Err(RecStoreError::ContentOverflow { .. })));

    block.write_content(0, &[1u8; 80]).unwrap();
}

#[test]
fn test_checked_content_length() {
    let (_store, manager) = setup_manager();
    let block = manager.create_new().unwrap();

    block.update_header(|h| h.block_content_length = 80).unwrap();
    assert_eq!(block.checked_content_length().unwrap(), 80);

    block.update_header(|h| h.block_content_length = 81).unwrap();
    let err = block.checked_content_length().unwrap_err();
    assert!(matches!(
        err,
        RecStoreError::ContentOverflow {
            block_id: 0,
            length: 81,
            capacity: 80
        }
    ));
}

// =============================================================================
// Cache Tests
// =============================================================================

#[test]
fn test_repeated_find_returns_same_instance() {
    let (_store, manager) = setup_manager();
    manager.create_new().unwrap();

    let a = manager.find(0).unwrap().unwrap();
    let b = manager.find(0).unwrap().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(manager.cached_blocks(), 1);
}

#[test]
fn test_released_blocks_leave_cache() {
    let (_store, manager) = setup_manager();

    let blocks: Vec<_> = (0..4).map(|_| manager.create_new().unwrap()).collect();
    assert_eq!(manager.cached_blocks(), 4);

    drop(blocks);
    assert_eq!(manager.cached_blocks(), 0);
}

#[test]
fn test_header_change_visible_through_other_handle() {
    let (_store, manager) = setup_manager();
    let a = manager.create_new().unwrap();
    let b = manager.find(0).unwrap().unwrap();

    a.update_header(|h| h.next_block_id = 3).unwrap();

    assert_eq!(b.next_block_id(), 3);
}

#[test]
fn test_refind_after_eviction_reads_store() {
    let (_store, manager) = setup_manager();
    {
        let block = manager.create_new().unwrap();
        block.update_header(|h| h.is_deleted = true).unwrap();
    }
    assert_eq!(manager.cached_blocks(), 0);

    let block = manager.find(0).unwrap().unwrap();
    assert!(block.is_deleted());
}

#[test]
fn test_concurrent_find_shares_one_handle() {
    let (_store, manager) = setup_manager();
    for _ in 0..4 {
        manager.create_new().unwrap();
    }
    assert_eq!(manager.cached_blocks(), 0);

    let handles: Vec<BlockRef> = crossbeam::scope(|s| {
        let joins: Vec<_> = (0..8)
            .map(|_| {
                let manager = &manager;
                s.spawn(move |_| manager.find(2).unwrap().unwrap())
            })
            .collect();
        joins.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    for handle in &handles[1..] {
        assert!(Arc::ptr_eq(&handles[0], handle));
    }
    assert_eq!(manager.cached_blocks(), 1);
}
