//! Error types for recstore
//!
//! Provides a unified error type for all operations.
//!
//! A missing record is not an error: `find` reports it as `Ok(None)`.
//! Everything here is fatal to the operation that raised it and is never
//! retried by this crate.

use thiserror::Error;

/// Result type alias using RecStoreError
pub type Result<T> = std::result::Result<T, RecStoreError>;

/// Unified error type for recstore operations
#[derive(Debug, Error)]
pub enum RecStoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Corruption Errors
    // -------------------------------------------------------------------------
    #[error("Storage corruption detected: {0}")]
    Corruption(String),

    #[error("Block {block_id} is referenced by a chain but does not exist")]
    MissingBlock { block_id: u32 },

    #[error("Block {block_id} claims {length} content bytes, capacity is {capacity}")]
    ContentOverflow {
        block_id: u32,
        length: u64,
        capacity: usize,
    },

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Record length {length} exceeds the maximum of {max} bytes")]
    RecordTooLarge { length: u64, max: usize },

    // -------------------------------------------------------------------------
    // Record Addressing Errors
    // -------------------------------------------------------------------------
    #[error("Record {record_id} not found")]
    RecordNotFound { record_id: u32 },

    #[error("Record {record_id} is reserved for the free list")]
    ReservedRecord { record_id: u32 },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RecStoreError {
    /// True for errors that mean the on-disk structure can no longer be trusted
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            RecStoreError::Corruption(_)
                | RecStoreError::MissingBlock { .. }
                | RecStoreError::ContentOverflow { .. }
        )
    }
}
