//! # recstore
//!
//! An embedded record-storage engine with:
//! - Fixed-size blocks carved out of a single growable byte store
//! - Variable-length records stored as doubly linked block chains
//! - Free-space reuse through a free list kept in record 0
//! - Single-writer/multi-reader concurrency model
//!
//! It provides block- and record-level consistency only: no transactions,
//! no multi-record atomicity, no schema.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Callers                                 │
//! │        (indexes, key-value maps, queues, graphs)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ create / find / update / delete
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Record Manager                              │
//! │         (RwLock: one writer or many readers)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Free List  │          │   Record    │
//!   │ (record 0)  │          │   Chains    │
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬────────────┘
//!                       ▼
//!               ┌───────────────┐
//!               │ Block Manager │
//!               │ (live cache)  │
//!               └───────┬───────┘
//!                       ▼
//!               ┌───────────────┐
//!               │  Byte Store   │
//!               │ (file/memory) │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod block;
pub mod record;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RecStoreError, Result};
pub use config::{Config, SyncStrategy};
pub use record::{RecordId, RecordManager, StoreStats, FREE_LIST_RECORD_ID};
pub use store::{ByteStore, FileStore, MemoryStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of recstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
