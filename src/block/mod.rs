//! Block Module
//!
//! Partitions a byte store into fixed-size blocks.
//!
//! ## Responsibilities
//! - Translate block ids to byte ranges (`id * block_size`)
//! - Encode/decode the header embedded at the start of each block
//! - Grow the store one whole block at a time
//! - Keep one in-memory handle per live block
//!
//! ## Block Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header (header_size bytes, default 48)                   │
//! │   next (8) | record_len (8) | content_len (8) |          │
//! │   prev (8) | deleted (8) | crc32 (4) | reserved          │
//! ├──────────────────────────────────────────────────────────┤
//! │ Content (block_size - header_size bytes)                 │
//! │   only the first content_len bytes are meaningful        │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod handle;
mod header;
mod manager;

pub use handle::{Block, BlockRef};
pub use header::{BlockHeader, HEADER_LAYOUT_LEN};
pub use manager::BlockManager;

use crate::config::Config;
use crate::error::{RecStoreError, Result};

/// Ordinal position of a block in the byte store
pub type BlockId = u32;

/// `next_block_id` / `previous_block_id` value meaning "no such block"
pub const NO_BLOCK: BlockId = 0;

/// Smallest block size accepted
pub const MIN_BLOCK_SIZE: usize = 128;

/// Leading bytes read when a block is first looked up
pub(crate) const SECTOR_PROBE_SIZE: usize = 512;

// =============================================================================
// Block Layout
// =============================================================================

/// Validated block geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    block_size: usize,
    header_size: usize,
}

impl BlockLayout {
    /// Validate and build a layout
    pub fn new(block_size: usize, header_size: usize) -> Result<Self> {
        if block_size < MIN_BLOCK_SIZE {
            return Err(RecStoreError::Config(format!(
                "block size {} is below the minimum of {}",
                block_size, MIN_BLOCK_SIZE
            )));
        }
        if header_size < HEADER_LAYOUT_LEN {
            return Err(RecStoreError::Config(format!(
                "header size {} cannot hold the {}-byte block header",
                header_size, HEADER_LAYOUT_LEN
            )));
        }
        if header_size >= block_size {
            return Err(RecStoreError::Config(format!(
                "header size {} must be smaller than block size {}",
                header_size, block_size
            )));
        }
        Ok(Self {
            block_size,
            header_size,
        })
    }

    /// Layout described by a config
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            block_size: config.block_size,
            header_size: config.header_size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Content bytes available in each block
    pub fn content_size(&self) -> usize {
        self.block_size - self.header_size
    }

    /// Absolute byte offset of a block
    pub fn block_offset(&self, id: BlockId) -> u64 {
        id as u64 * self.block_size as u64
    }

    /// Absolute byte offset of a block's content region
    pub fn content_offset(&self, id: BlockId) -> u64 {
        self.block_offset(id) + self.header_size as u64
    }

    /// Bytes read to decode a header on lookup
    pub(crate) fn probe_size(&self) -> usize {
        self.block_size.min(SECTOR_PROBE_SIZE).max(self.header_size)
    }
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            block_size: crate::config::DEFAULT_BLOCK_SIZE,
            header_size: crate::config::DEFAULT_HEADER_SIZE,
        }
    }
}
