//! In-memory byte store
//!
//! Used by tests and by callers that want a throwaway store.

use std::io;

use parking_lot::RwLock;

use crate::error::Result;

use super::ByteStore;

/// Byte store backed by a growable `Vec<u8>`
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store over existing bytes (e.g. a snapshot of a data file)
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(bytes),
        }
    }

    /// Copy of the current contents
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    fn range(offset: u64, len: usize, size: usize) -> Result<std::ops::Range<usize>> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset overflows usize"))?;
        let end = start
            .checked_add(len)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "range overflows usize"))?;
        if end > size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("range {}..{} past end of store ({} bytes)", start, end, size),
            )
            .into());
        }
        Ok(start..end)
    }
}

impl ByteStore for MemoryStore {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let data = self.data.read();
        let range = Self::range(offset, buf.len(), data.len())?;
        buf.copy_from_slice(&data[range]);
        Ok(())
    }

    fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut data = self.data.write();
        let end = offset as usize + bytes.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        let range = Self::range(offset, bytes.len(), data.len())?;
        data[range].copy_from_slice(bytes);
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn set_len(&self, len: u64) -> Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length overflows usize"))?;
        let mut data = self.data.write();
        if len > data.len() {
            data.resize(len, 0);
        }
        Ok(())
    }
}
