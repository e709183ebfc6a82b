//! Record Module
//!
//! Variable-length records stored as chains of blocks.
//!
//! ## Responsibilities
//! - Create / find / update / delete opaque byte payloads
//! - Chain blocks head → tail through their headers
//! - Reclaim freed blocks through a free list kept in record 0
//! - Serialise writers against readers with one reader/writer lock
//!
//! ## Record Chain
//! ```text
//!   head (id = record id)        interior                tail
//! ┌──────────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │ prev = 0             │   │ prev = head      │   │ prev = interior  │
//! │ next = interior ─────┼──▶│ next = tail ─────┼──▶│ next = 0         │
//! │ record_len = N       │   │ record_len = 0   │   │ record_len = 0   │
//! │ content: full        │   │ content: full    │   │ content: rest    │
//! └──────────────────────┘   └──────────────────┘   └──────────────────┘
//! ```
//!
//! ## Free List
//! Record 0 is not a payload. Its content is a stack of 4-byte block ids;
//! ids are pushed onto and popped off the end of its last block.

mod freelist;
mod manager;
mod typed;

pub use manager::RecordManager;

use crate::block::BlockId;

/// Identifier of a record: the id of its head block
pub type RecordId = BlockId;

/// Record id reserved for the free list's own chain
pub const FREE_LIST_RECORD_ID: RecordId = 0;

/// Size of one free-list entry
pub(crate) const FREE_LIST_ENTRY_SIZE: usize = 4;

/// Point-in-time view of the store's space usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Whole blocks in the byte store
    pub block_count: u64,
    /// Block ids waiting on the free list
    pub free_blocks: u64,
    /// Blocks making up the free list's own chain
    pub free_list_blocks: u64,
    /// Block handles currently alive in memory
    pub cached_blocks: usize,
}
