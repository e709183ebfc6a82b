//! Block Manager
//!
//! Hands out block handles over a byte store.
//!
//! ## Responsibilities
//! - Look up existing blocks by id (`find`)
//! - Extend the store by exactly one block (`create_new`)
//! - Cache live handles so one block has one in-memory instance
//!
//! ## Concurrency:
//! - `cache`: Mutex around the id → handle map (lookups from many readers)
//! - Handles share the store; header writes go straight through

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{RecStoreError, Result};
use crate::store::ByteStore;

use super::handle::BlockCache;
use super::{Block, BlockHeader, BlockId, BlockLayout, BlockRef};

/// Partitions a byte store into blocks
pub struct BlockManager {
    /// The medium every block lives in
    store: Arc<dyn ByteStore>,

    /// Block geometry (fixed for the life of the store)
    layout: BlockLayout,

    /// Live handles, evicted when their last `Arc` drops
    cache: Arc<BlockCache>,
}

impl BlockManager {
    /// Create a manager over `store` with the given geometry
    pub fn new(store: Arc<dyn ByteStore>, layout: BlockLayout) -> Self {
        Self {
            store,
            layout,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Look up a block
    ///
    /// Returns:
    /// - `Ok(Some(block))` — the block lies entirely inside the store
    /// - `Ok(None)` — the block was never allocated
    /// - `Err(_)` — I/O failure or an undecodable header
    pub fn find(&self, id: BlockId) -> Result<Option<BlockRef>> {
        let end = self.layout.block_offset(id) + self.layout.block_size() as u64;
        if end > self.store.size()? {
            return Ok(None);
        }

        if let Some(block) = self.cached(id) {
            return Ok(Some(block));
        }

        // Read a sector's worth up front, outside the cache lock; the header
        // sits at the start of it
        let mut probe = vec![0u8; self.layout.probe_size()];
        self.store.read_at(self.layout.block_offset(id), &mut probe)?;
        let header = BlockHeader::decode(id, &probe[..self.layout.header_size()])?;

        // Another reader may have loaded the same block meanwhile
        let mut cache = self.cache.lock();
        if let Some(block) = cache.get(&id).and_then(Weak::upgrade) {
            return Ok(Some(block));
        }
        let block = self.new_handle(id, header);
        cache.insert(id, Arc::downgrade(&block));
        Ok(Some(block))
    }

    /// Look up a block that a chain says must exist
    pub fn require(&self, id: BlockId) -> Result<BlockRef> {
        self.find(id)?
            .ok_or(RecStoreError::MissingBlock { block_id: id })
    }

    /// Append a new zeroed block to the end of the store
    ///
    /// Fails with `Corruption` if the store length is not a whole number of
    /// blocks: the store is never extended by a partial block.
    pub fn create_new(&self) -> Result<BlockRef> {
        let block_size = self.layout.block_size() as u64;
        let length = self.store.size()?;
        if length % block_size != 0 {
            return Err(RecStoreError::Corruption(format!(
                "store length {} is not a multiple of block size {}",
                length, block_size
            )));
        }

        let id = BlockId::try_from(length / block_size).map_err(|_| {
            RecStoreError::Corruption(format!("store holds more than {} blocks", BlockId::MAX))
        })?;

        self.store.set_len(length + block_size)?;
        let header = BlockHeader::default();
        self.store.write_at(
            self.layout.block_offset(id),
            &header.encode(self.layout.header_size()),
        )?;

        let block = self.new_handle(id, header);
        self.cache.lock().insert(id, Arc::downgrade(&block));
        debug!(block_id = id, "extended store by one block");
        Ok(block)
    }

    /// Number of whole blocks in the store
    pub fn block_count(&self) -> Result<u64> {
        Ok(self.store.size()? / self.layout.block_size() as u64)
    }

    /// Number of block handles currently alive
    pub fn cached_blocks(&self) -> usize {
        self.cache
            .lock()
            .values()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    /// Flush the underlying store
    pub fn sync(&self) -> Result<()> {
        self.store.sync()
    }

    /// Whether the store ends on a block boundary
    pub fn is_aligned(&self) -> Result<bool> {
        Ok(self.store.size()? % self.layout.block_size() as u64 == 0)
    }

    fn cached(&self, id: BlockId) -> Option<BlockRef> {
        self.cache.lock().get(&id).and_then(Weak::upgrade)
    }

    fn new_handle(&self, id: BlockId, header: BlockHeader) -> BlockRef {
        Arc::new(Block::new(
            id,
            self.layout,
            header,
            Arc::clone(&self.store),
            Arc::downgrade(&self.cache),
        ))
    }
}
