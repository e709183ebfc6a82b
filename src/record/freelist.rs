//! Free list
//!
//! Stack of reusable block ids stored in record 0's own chain.
//!
//! ## Invariants
//! - Every free-list block except the tail is full
//! - Ids are pushed to and popped from the end of the tail (LIFO)
//! - Every id on the list names a block with `is_deleted = true`
//!
//! ## Allocation
//! 1. The tail holds ids: pop the last one
//! 2. The tail is empty and is not block 0: unlink it and hand it out
//! 3. Otherwise: extend the store by one block
//!
//! ## Freeing
//! 1. The tail has room for 4 more bytes: append the id
//! 2. Otherwise: extend the store, link the new block as the tail, append

use tracing::debug;

use crate::block::{BlockId, BlockManager, BlockRef, NO_BLOCK};
use crate::error::{RecStoreError, Result};

use super::{FREE_LIST_ENTRY_SIZE, FREE_LIST_RECORD_ID};

/// In-memory cursor over the on-disk free list
#[derive(Debug, Default)]
pub(crate) struct FreeList {
    /// Last block of the chain, once known
    tail: Option<BlockId>,
}

impl FreeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a block for a record, reusing a freed one when possible
    ///
    /// The returned block has a zeroed header.
    pub fn allocate(&mut self, blocks: &BlockManager) -> Result<BlockRef> {
        let tail = self.tail(blocks)?;
        let used = Self::entries_len(&tail)?;

        if used >= FREE_LIST_ENTRY_SIZE {
            let mut entry = [0u8; FREE_LIST_ENTRY_SIZE];
            tail.read_content(used - FREE_LIST_ENTRY_SIZE, &mut entry)?;
            let id = BlockId::from_le_bytes(entry);
            tail.update_header(|h| h.block_content_length = (used - FREE_LIST_ENTRY_SIZE) as u64)?;

            let block = blocks.require(id)?;
            if id == FREE_LIST_RECORD_ID || !block.is_deleted() {
                return Err(RecStoreError::Corruption(format!(
                    "free list entry {} names a block that is not free",
                    id
                )));
            }
            block.reset()?;
            debug!(block_id = id, "reused freed block");
            return Ok(block);
        }

        if tail.id() != FREE_LIST_RECORD_ID {
            // An empty tail is itself spare space
            let previous = blocks.require(tail.previous_block_id())?;
            previous.update_header(|h| h.next_block_id = NO_BLOCK)?;
            self.tail = Some(previous.id());
            tail.reset()?;
            debug!(block_id = tail.id(), "reused empty free list block");
            return Ok(tail);
        }

        let block = blocks.create_new()?;
        debug!(block_id = block.id(), "allocated new block");
        Ok(block)
    }

    /// Tombstone `block` and push its id onto the list
    pub fn release(&mut self, blocks: &BlockManager, block: &BlockRef) -> Result<()> {
        let id = block.id();
        if id == FREE_LIST_RECORD_ID {
            return Err(RecStoreError::ReservedRecord { record_id: id });
        }

        let tail = self.tail(blocks)?;
        block.update_header(|h| h.is_deleted = true)?;

        let used = Self::entries_len(&tail)?;
        let entry = id.to_le_bytes();
        if used + FREE_LIST_ENTRY_SIZE <= tail.capacity() {
            tail.write_content(used, &entry)?;
            tail.update_header(|h| h.block_content_length = (used + FREE_LIST_ENTRY_SIZE) as u64)?;
        } else {
            let new_tail = blocks.create_new()?;
            new_tail.write_content(0, &entry)?;
            new_tail.update_header(|h| {
                h.previous_block_id = tail.id();
                h.block_content_length = FREE_LIST_ENTRY_SIZE as u64;
            })?;
            tail.update_header(|h| h.next_block_id = new_tail.id())?;
            self.tail = Some(new_tail.id());
            debug!(block_id = new_tail.id(), "grew free list");
        }

        debug!(block_id = id, "freed block");
        Ok(())
    }

    /// Every id on the list, bottom of the stack first
    pub fn ids(&self, blocks: &BlockManager) -> Result<Vec<BlockId>> {
        let mut ids = Vec::new();
        for block in Self::chain(blocks)? {
            let used = Self::entries_len(&block)?;
            let mut content = vec![0u8; used];
            block.read_content(0, &mut content)?;
            ids.extend(
                content
                    .chunks_exact(FREE_LIST_ENTRY_SIZE)
                    .map(|entry| BlockId::from_le_bytes(entry.try_into().unwrap())),
            );
        }
        Ok(ids)
    }

    /// Blocks making up the list (0 before first use)
    pub fn block_count(&self, blocks: &BlockManager) -> Result<u64> {
        Ok(Self::chain(blocks)?.len() as u64)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Current tail, creating block 0 on first use
    fn tail(&mut self, blocks: &BlockManager) -> Result<BlockRef> {
        if let Some(id) = self.tail {
            return blocks.require(id);
        }

        if blocks.find(FREE_LIST_RECORD_ID)?.is_none() {
            let root = blocks.create_new()?;
            if root.id() != FREE_LIST_RECORD_ID {
                return Err(RecStoreError::Corruption(format!(
                    "free list root created as block {}",
                    root.id()
                )));
            }
            self.tail = Some(root.id());
            return Ok(root);
        }

        let tail = Self::chain(blocks)?
            .pop()
            .ok_or(RecStoreError::MissingBlock {
                block_id: FREE_LIST_RECORD_ID,
            })?;
        self.tail = Some(tail.id());
        Ok(tail)
    }

    /// Walk record 0 from block 0 to its tail
    fn chain(blocks: &BlockManager) -> Result<Vec<BlockRef>> {
        let Some(root) = blocks.find(FREE_LIST_RECORD_ID)? else {
            return Ok(Vec::new());
        };

        let limit = blocks.block_count()?;
        let mut chain = vec![root];
        loop {
            let current = chain[chain.len() - 1].id();
            let next = chain[chain.len() - 1].next_block_id();
            if next == NO_BLOCK {
                break;
            }
            if chain.len() as u64 >= limit {
                return Err(RecStoreError::Corruption(
                    "free list chain loops back on itself".to_string(),
                ));
            }

            let block = blocks.require(next)?;
            if block.previous_block_id() != current {
                return Err(RecStoreError::Corruption(format!(
                    "free list block {} does not link back to {}",
                    next, current
                )));
            }
            chain.push(block);
        }
        Ok(chain)
    }

    /// Bytes of ids held by a free-list block
    fn entries_len(block: &BlockRef) -> Result<usize> {
        let used = block.checked_content_length()?;
        if used % FREE_LIST_ENTRY_SIZE != 0 {
            return Err(RecStoreError::Corruption(format!(
                "free list block {} holds {} bytes, not a whole number of entries",
                block.id(),
                used
            )));
        }
        Ok(used)
    }
}
