//! Byte Store Module
//!
//! The flat, byte-addressable medium underneath the block layer.
//!
//! ## Responsibilities
//! - Positioned reads and writes at absolute offsets
//! - Report the current length
//! - Grow the medium (new bytes read back as zero)
//!
//! Nothing else is asked of a store: no locking, no memory mapping. The
//! block layer never shrinks a store.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// Abstract interface over a seekable, growable byte medium.
///
/// Production: `FileStore`
/// Testing: `MemoryStore`
///
/// All methods take `&self`; implementations serialise access internally.
pub trait ByteStore: Send + Sync {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Reading past the end is an `UnexpectedEof` I/O error.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `offset`.
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Current length in bytes.
    fn size(&self) -> Result<u64>;

    /// Grow the store to `len` bytes, zero-filling the new range.
    fn set_len(&self, len: u64) -> Result<()>;

    /// Flush buffered writes to durable media.
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
