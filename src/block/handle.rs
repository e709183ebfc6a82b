//! Block handle
//!
//! In-memory view of one block: its id, its decoded header and the store it
//! lives in. Header changes are written through immediately, so a handle
//! never holds state the store has not seen.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{RecStoreError, Result};
use crate::store::ByteStore;

use super::{BlockHeader, BlockId, BlockLayout};

/// Shared handle to a live block
pub type BlockRef = Arc<Block>;

/// Live-block cache: id → handle, without keeping the handle alive
pub(crate) type BlockCache = Mutex<HashMap<BlockId, Weak<Block>>>;

/// One fixed-size block
pub struct Block {
    id: BlockId,
    layout: BlockLayout,
    header: Mutex<BlockHeader>,
    store: Arc<dyn ByteStore>,
    /// Cache to leave when the last handle drops
    cache: Weak<BlockCache>,
}

impl Block {
    pub(crate) fn new(
        id: BlockId,
        layout: BlockLayout,
        header: BlockHeader,
        store: Arc<dyn ByteStore>,
        cache: Weak<BlockCache>,
    ) -> Self {
        Self {
            id,
            layout,
            header: Mutex::new(header),
            store,
            cache,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Snapshot of the header
    pub fn header(&self) -> BlockHeader {
        *self.header.lock()
    }

    pub fn next_block_id(&self) -> BlockId {
        self.header.lock().next_block_id
    }

    pub fn previous_block_id(&self) -> BlockId {
        self.header.lock().previous_block_id
    }

    pub fn record_length(&self) -> u64 {
        self.header.lock().record_length
    }

    pub fn content_length(&self) -> u64 {
        self.header.lock().block_content_length
    }

    pub fn is_deleted(&self) -> bool {
        self.header.lock().is_deleted
    }

    /// Content capacity of this block
    pub fn capacity(&self) -> usize {
        self.layout.content_size()
    }

    /// `block_content_length` as a usize, checked against the capacity
    pub fn checked_content_length(&self) -> Result<usize> {
        let length = self.content_length();
        if length > self.capacity() as u64 {
            return Err(RecStoreError::ContentOverflow {
                block_id: self.id,
                length,
                capacity: self.capacity(),
            });
        }
        Ok(length as usize)
    }

    /// Apply `f` to the header and write the result to the store
    pub fn update_header<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BlockHeader),
    {
        let mut header = self.header.lock();
        let mut updated = *header;
        f(&mut updated);
        if updated == *header {
            return Ok(());
        }

        let encoded = updated.encode(self.layout.header_size());
        self.store
            .write_at(self.layout.block_offset(self.id), &encoded)?;
        *header = updated;
        Ok(())
    }

    /// Zero every header field (reuse of a freed block)
    pub fn reset(&self) -> Result<()> {
        let encoded = BlockHeader::default().encode(self.layout.header_size());
        let mut header = self.header.lock();
        self.store
            .write_at(self.layout.block_offset(self.id), &encoded)?;
        *header = BlockHeader::default();
        Ok(())
    }

    /// Read `buf.len()` content bytes starting at `offset` within the content region
    pub fn read_content(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        self.check_content_range(offset, buf.len())?;
        self.store
            .read_at(self.layout.content_offset(self.id) + offset as u64, buf)
    }

    /// Write `data` at `offset` within the content region
    pub fn write_content(&self, offset: usize, data: &[u8]) -> Result<()> {
        self.check_content_range(offset, data.len())?;
        self.store
            .write_at(self.layout.content_offset(self.id) + offset as u64, data)
    }

    fn check_content_range(&self, offset: usize, len: usize) -> Result<()> {
        let end = offset.saturating_add(len);
        if end > self.capacity() {
            return Err(RecStoreError::ContentOverflow {
                block_id: self.id,
                length: end as u64,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // Only evict our own entry; a newer handle for the same id may
        // already have replaced it.
        if let Some(cache) = self.cache.upgrade() {
            let mut cache = cache.lock();
            if cache
                .get(&self.id)
                .is_some_and(|entry| entry.strong_count() == 0)
            {
                cache.remove(&self.id);
            }
        }
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("header", &self.header())
            .finish()
    }
}
