//! Configuration for recstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::block::BlockLayout;
use crate::error::{RecStoreError, Result};

/// Default block size (one 4 KiB page)
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Default size of the header region at the start of every block
pub const DEFAULT_HEADER_SIZE: usize = 48;

/// Hard ceiling on a single record's length (4 MiB)
pub const DEFAULT_MAX_RECORD_LENGTH: usize = 4 * 1024 * 1024;

/// Main configuration for a record store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Data file holding every block, back to back
    pub path: PathBuf,

    /// Sync strategy: how often the data file is fsynced
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Block Geometry
    // -------------------------------------------------------------------------
    /// Size of one block in bytes (header + content)
    pub block_size: usize,

    /// Size of the header region at the start of each block
    pub header_size: usize,

    // -------------------------------------------------------------------------
    // Record Limits
    // -------------------------------------------------------------------------
    /// Largest record `find` will assemble and `create`/`update` will accept
    pub max_record_length: usize,
}

/// Data file sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync only when `sync()` / `close()` is called
    Manual,

    /// fsync after every write and every extension (safest, slowest)
    EveryWrite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./recstore.db"),
            sync_strategy: SyncStrategy::Manual,
            block_size: DEFAULT_BLOCK_SIZE,
            header_size: DEFAULT_HEADER_SIZE,
            max_record_length: DEFAULT_MAX_RECORD_LENGTH,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the geometry and limits
    pub fn validate(&self) -> Result<()> {
        BlockLayout::new(self.block_size, self.header_size)?;
        if self.max_record_length == 0 || self.max_record_length as u64 > u32::MAX as u64 {
            return Err(RecStoreError::Config(format!(
                "max record length {} is out of range",
                self.max_record_length
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the block size (in bytes)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the header region size (in bytes)
    pub fn header_size(mut self, size: usize) -> Self {
        self.config.header_size = size;
        self
    }

    /// Set the record length ceiling (in bytes)
    pub fn max_record_length(mut self, length: usize) -> Self {
        self.config.max_record_length = length;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
