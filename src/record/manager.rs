//! Record Manager
//!
//! Create / find / update / delete for opaque byte payloads.
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
//!
//! - **Writes** (create/update/delete): take the write guard once, at the
//!   public entry point, and hold it for the whole operation. Internal
//!   helpers receive `&mut RecordState` instead of locking again, so there
//!   is no recursive acquisition.
//! - **Reads** (find/exists/stats): take the read guard; any number run
//!   together and none observes a half-written chain.
//!
//! There is no per-record locking and no multi-record atomicity. A crash in
//! the middle of a write can leave a chain partly rewritten.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::block::{BlockId, BlockLayout, BlockManager, BlockRef, NO_BLOCK};
use crate::config::Config;
use crate::error::{RecStoreError, Result};
use crate::store::{ByteStore, FileStore};

use super::freelist::FreeList;
use super::{RecordId, StoreStats, FREE_LIST_RECORD_ID};

/// The record store
pub struct RecordManager {
    /// Store configuration
    config: Config,

    /// Everything the lock protects
    state: RwLock<RecordState>,
}

/// State behind the record manager's lock
struct RecordState {
    /// Block lookup and creation
    blocks: BlockManager,

    /// Cursor over record 0
    free_list: FreeList,

    /// Ceiling on any record's length
    max_record_length: usize,
}

impl RecordManager {
    /// Open or create a file-backed store described by `config`
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let store = FileStore::open(&config.path, config.sync_strategy)?;
        Self::with_store(Arc::new(store), config)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data file
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().path(path).build();
        Self::open(config)
    }

    /// Build a manager over any byte store
    ///
    /// `config.path` and `config.sync_strategy` are ignored; the store is
    /// used as given.
    pub fn with_store(store: Arc<dyn ByteStore>, config: Config) -> Result<Self> {
        let layout = BlockLayout::from_config(&config)?;
        let blocks = BlockManager::new(store, layout);

        if !blocks.is_aligned()? {
            warn!(
                block_size = layout.block_size(),
                "store length is not a whole number of blocks; new blocks cannot be allocated"
            );
        }
        info!(
            block_count = blocks.block_count()?,
            block_size = layout.block_size(),
            header_size = layout.header_size(),
            "opened record store"
        );

        Ok(Self {
            state: RwLock::new(RecordState {
                blocks,
                free_list: FreeList::new(),
                max_record_length: config.max_record_length,
            }),
            config,
        })
    }

    // =========================================================================
    // Writes (exclusive)
    // =========================================================================

    /// Store `payload` as a new record and return its id
    pub fn create(&self, payload: &[u8]) -> Result<RecordId> {
        let mut state = self.state.write();
        state.check_length(payload.len())?;
        let head = state.allocate()?;
        state.write_chain(vec![head], payload)
    }

    /// Store a payload built from the record's own id
    ///
    /// `generate` runs after the head block is allocated, so the payload can
    /// embed the id it will be stored under. If `generate` panics the head
    /// is freed before the panic propagates.
    pub fn create_with<F>(&self, generate: F) -> Result<RecordId>
    where
        F: FnOnce(RecordId) -> Vec<u8>,
    {
        let mut state = self.state.write();
        let head = state.allocate()?;

        let id = head.id();
        let payload = match panic::catch_unwind(AssertUnwindSafe(|| generate(id))) {
            Ok(payload) => payload,
            Err(cause) => {
                // Hand the head back before the panic leaves the write guard
                if let Err(e) = state.release(&head) {
                    warn!(record_id = id, error = %e, "could not free head after generator panic");
                }
                panic::resume_unwind(cause);
            }
        };

        if let Err(e) = state.check_length(payload.len()) {
            state.release(&head)?;
            return Err(e);
        }
        state.write_chain(vec![head], &payload)
    }

    /// Create a zero-length record
    pub fn create_empty(&self) -> Result<RecordId> {
        self.create(&[])
    }

    /// Replace a record's payload, keeping its id
    ///
    /// Existing blocks are rewritten in order; the chain grows from the free
    /// list when the payload is longer and surplus blocks are freed when it
    /// is shorter.
    pub fn update(&self, id: RecordId, payload: &[u8]) -> Result<()> {
        if id == FREE_LIST_RECORD_ID {
            return Err(RecStoreError::ReservedRecord { record_id: id });
        }

        let mut state = self.state.write();
        state.check_length(payload.len())?;
        let head = state
            .head(id)?
            .ok_or(RecStoreError::RecordNotFound { record_id: id })?;
        let chain = state.chain(head)?;
        state.write_chain(chain, payload)?;
        Ok(())
    }

    /// Delete a record and free every block in its chain
    ///
    /// Deleting an id that is not a live record (already deleted, an
    /// interior block, never allocated) changes nothing.
    pub fn delete(&self, id: RecordId) -> Result<()> {
        if id == FREE_LIST_RECORD_ID {
            return Err(RecStoreError::ReservedRecord { record_id: id });
        }

        let mut state = self.state.write();
        let Some(head) = state.head(id)? else {
            warn!(record_id = id, "delete of a record that does not exist");
            return Ok(());
        };

        // Walk the whole chain first so a broken link frees nothing.
        // Tail first: the head ends up on top of the stack.
        let chain = state.chain(head)?;
        for block in chain.iter().rev() {
            state.release(block)?;
        }

        debug!(record_id = id, blocks = chain.len(), "deleted record");
        Ok(())
    }

    // =========================================================================
    // Reads (shared)
    // =========================================================================

    /// Read a record
    ///
    /// Returns:
    /// - `Ok(Some(payload))` — the record exists
    /// - `Ok(None)` — no live record has this id
    /// - `Err(_)` — the chain is damaged or too long
    pub fn find(&self, id: RecordId) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();
        let Some(head) = state.head(id)? else {
            return Ok(None);
        };
        let chain = state.chain(head)?;
        state.read_chain(&chain).map(Some)
    }

    /// Whether `id` names a live record
    pub fn exists(&self, id: RecordId) -> Result<bool> {
        Ok(self.state.read().head(id)?.is_some())
    }

    /// Space usage snapshot
    pub fn stats(&self) -> Result<StoreStats> {
        let state = self.state.read();
        Ok(StoreStats {
            block_count: state.blocks.block_count()?,
            free_blocks: state.free_list.ids(&state.blocks)?.len() as u64,
            free_list_blocks: state.free_list.block_count(&state.blocks)?,
            cached_blocks: state.blocks.cached_blocks(),
        })
    }

    /// Block ids on the free list, bottom of the stack first
    pub fn free_block_ids(&self) -> Result<Vec<BlockId>> {
        let state = self.state.read();
        state.free_list.ids(&state.blocks)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush the byte store to durable media
    pub fn sync(&self) -> Result<()> {
        self.state.read().blocks.sync()
    }

    /// Close the store gracefully
    pub fn close(self) -> Result<()> {
        self.sync()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the block geometry
    pub fn layout(&self) -> BlockLayout {
        self.state.read().blocks.layout()
    }
}

impl RecordState {
    fn allocate(&mut self) -> Result<BlockRef> {
        self.free_list.allocate(&self.blocks)
    }

    fn release(&mut self, block: &BlockRef) -> Result<()> {
        self.free_list.release(&self.blocks, block)
    }

    fn check_length(&self, length: usize) -> Result<()> {
        if length > self.max_record_length {
            return Err(RecStoreError::RecordTooLarge {
                length: length as u64,
                max: self.max_record_length,
            });
        }
        Ok(())
    }

    /// Head block of a live record, if `id` names one
    fn head(&self, id: RecordId) -> Result<Option<BlockRef>> {
        if id == FREE_LIST_RECORD_ID {
            return Ok(None);
        }
        let Some(head) = self.blocks.find(id)? else {
            return Ok(None);
        };
        // Tombstones and interior blocks are not records
        let header = head.header();
        if header.is_deleted || !header.is_head() {
            return Ok(None);
        }
        // Block 0's successor links back to 0 as well, but belongs to the free list
        if let Some(root) = self.blocks.find(FREE_LIST_RECORD_ID)? {
            if root.next_block_id() == id {
                return Ok(None);
            }
        }
        Ok(Some(head))
    }

    /// Every block of a record, head first, with links checked
    fn chain(&self, head: BlockRef) -> Result<Vec<BlockRef>> {
        let record_length = head.record_length();
        if record_length > self.max_record_length as u64 {
            return Err(RecStoreError::RecordTooLarge {
                length: record_length,
                max: self.max_record_length,
            });
        }

        let capacity = self.blocks.layout().content_size() as u64;
        let max_blocks = record_length.div_ceil(capacity).max(1);

        let mut chain = vec![head];
        loop {
            let current = &chain[chain.len() - 1];
            let (current_id, next) = (current.id(), current.next_block_id());
            if next == NO_BLOCK {
                break;
            }
            if chain.len() as u64 >= max_blocks {
                return Err(RecStoreError::Corruption(format!(
                    "record {} chain is longer than its length of {} bytes allows",
                    chain[0].id(),
                    record_length
                )));
            }

            let block = self.blocks.require(next)?;
            if block.is_deleted() {
                return Err(RecStoreError::Corruption(format!(
                    "record {} links to deleted block {}",
                    chain[0].id(),
                    next
                )));
            }
            if block.previous_block_id() != current_id {
                return Err(RecStoreError::Corruption(format!(
                    "block {} does not link back to {}",
                    next, current_id
                )));
            }
            chain.push(block);
        }
        Ok(chain)
    }

    /// Assemble a record's payload from its chain
    fn read_chain(&self, chain: &[BlockRef]) -> Result<Vec<u8>> {
        let length = chain[0].record_length() as usize;
        let mut data = vec![0u8; length];
        let mut offset = 0;

        for block in chain {
            let used = block.checked_content_length()?;
            if offset + used > length {
                return Err(RecStoreError::Corruption(format!(
                    "record {} chain holds more than {} bytes",
                    chain[0].id(),
                    length
                )));
            }
            block.read_content(0, &mut data[offset..offset + used])?;
            offset += used;
        }

        if offset != length {
            return Err(RecStoreError::Corruption(format!(
                "record {} chain holds {} of {} bytes",
                chain[0].id(),
                offset,
                length
            )));
        }
        Ok(data)
    }

    /// Stream `payload` over `existing` (head first), growing or shrinking the chain
    fn write_chain(&mut self, existing: Vec<BlockRef>, payload: &[u8]) -> Result<RecordId> {
        let head = Arc::clone(&existing[0]);
        let capacity = self.blocks.layout().content_size();

        let mut chunks = payload.chunks(capacity).peekable();
        let mut current = Arc::clone(&head);
        let mut used = 1;
        loop {
            let chunk = chunks.next().unwrap_or_default();
            if !chunk.is_empty() {
                current.write_content(0, chunk)?;
            }

            if chunks.peek().is_none() {
                current.update_header(|h| {
                    h.block_content_length = chunk.len() as u64;
                    h.next_block_id = NO_BLOCK;
                })?;
                break;
            }

            let next = match existing.get(used) {
                Some(block) => Arc::clone(block),
                None => {
                    let block = self.allocate()?;
                    block.update_header(|h| h.previous_block_id = current.id())?;
                    block
                }
            };
            current.update_header(|h| {
                h.block_content_length = chunk.len() as u64;
                h.next_block_id = next.id();
            })?;
            current = next;
            used += 1;
        }

        for surplus in &existing[used.min(existing.len())..] {
            self.release(surplus)?;
        }

        head.update_header(|h| h.record_length = payload.len() as u64)?;
        debug!(
            record_id = head.id(),
            length = payload.len(),
            blocks = used,
            freed = existing.len().saturating_sub(used),
            "wrote record"
        );
        Ok(head.id())
    }
}
