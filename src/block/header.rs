//! Block header codec
//!
//! Five integer slots in a fixed order, each 8 bytes little-endian, followed
//! by a CRC32 over the slots:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  ----------------------------------------
//! 0       8     next_block_id        (fits u32)
//! 8       8     record_length        (head block only)
//! 16      8     block_content_length
//! 24      8     previous_block_id    (fits u32)
//! 32      8     is_deleted           (0 or 1)
//! 40      4     crc32 of bytes 0..40
//! ```
//!
//! Bytes between the encoded header and `header_size` are reserved and
//! written as zero. An all-zero header is a freshly extended block and
//! decodes to `BlockHeader::default()` without a checksum.

use crate::error::{RecStoreError, Result};

use super::{BlockId, NO_BLOCK};

const SLOT_SIZE: usize = 8;
const NEXT_SLOT: usize = 0;
const RECORD_LENGTH_SLOT: usize = 1;
const CONTENT_LENGTH_SLOT: usize = 2;
const PREVIOUS_SLOT: usize = 3;
const DELETED_SLOT: usize = 4;
const SLOT_COUNT: usize = 5;

const CHECKSUM_OFFSET: usize = SLOT_COUNT * SLOT_SIZE;

/// Encoded header length: five slots plus the checksum
pub const HEADER_LAYOUT_LEN: usize = CHECKSUM_OFFSET + 4;

/// Decoded block header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Next block in the chain, or `NO_BLOCK`
    pub next_block_id: BlockId,
    /// Total record length; authoritative on the head block only
    pub record_length: u64,
    /// Content bytes used in this block
    pub block_content_length: u64,
    /// Previous block in the chain, or `NO_BLOCK` for a head block
    pub previous_block_id: BlockId,
    /// Tombstone flag
    pub is_deleted: bool,
}

impl BlockHeader {
    pub fn has_next(&self) -> bool {
        self.next_block_id != NO_BLOCK
    }

    /// A head block has no predecessor
    pub fn is_head(&self) -> bool {
        self.previous_block_id == NO_BLOCK
    }

    /// Encode into the first `HEADER_LAYOUT_LEN` bytes of `buf`
    pub fn encode_into(&self, buf: &mut [u8]) {
        let slots = [
            self.next_block_id as u64,
            self.record_length,
            self.block_content_length,
            self.previous_block_id as u64,
            self.is_deleted as u64,
        ];
        for (i, value) in slots.iter().enumerate() {
            buf[i * SLOT_SIZE..(i + 1) * SLOT_SIZE].copy_from_slice(&value.to_le_bytes());
        }
        let crc = crc32fast::hash(&buf[..CHECKSUM_OFFSET]);
        buf[CHECKSUM_OFFSET..HEADER_LAYOUT_LEN].copy_from_slice(&crc.to_le_bytes());
    }

    /// Encode into a zero-padded header region of `header_size` bytes
    pub fn encode(&self, header_size: usize) -> Vec<u8> {
        let mut buf = vec![0u8; header_size.max(HEADER_LAYOUT_LEN)];
        self.encode_into(&mut buf);
        buf
    }

    /// Decode from the start of a block; `block_id` is for error messages
    pub fn decode(block_id: BlockId, buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LAYOUT_LEN {
            return Err(RecStoreError::Corruption(format!(
                "block {}: header needs {} bytes, got {}",
                block_id,
                HEADER_LAYOUT_LEN,
                buf.len()
            )));
        }

        let raw = &buf[..HEADER_LAYOUT_LEN];
        if raw.iter().all(|&b| b == 0) {
            return Ok(Self::default());
        }

        let stored_crc = u32::from_le_bytes(raw[CHECKSUM_OFFSET..].try_into().unwrap());
        let actual_crc = crc32fast::hash(&raw[..CHECKSUM_OFFSET]);
        if stored_crc != actual_crc {
            return Err(RecStoreError::Corruption(format!(
                "block {}: header checksum mismatch (stored {:#010x}, computed {:#010x})",
                block_id, stored_crc, actual_crc
            )));
        }

        let slot = |i: usize| {
            u64::from_le_bytes(raw[i * SLOT_SIZE..(i + 1) * SLOT_SIZE].try_into().unwrap())
        };
        let block_ref = |i: usize, name: &str| -> Result<BlockId> {
            BlockId::try_from(slot(i)).map_err(|_| {
                RecStoreError::Corruption(format!(
                    "block {}: {} {} does not fit a block id",
                    block_id,
                    name,
                    slot(i)
                ))
            })
        };

        let is_deleted = match slot(DELETED_SLOT) {
            0 => false,
            1 => true,
            other => {
                return Err(RecStoreError::Corruption(format!(
                    "block {}: invalid deleted flag {}",
                    block_id, other
                )))
            }
        };

        Ok(Self {
            next_block_id: block_ref(NEXT_SLOT, "next block id")?,
            record_length: slot(RECORD_LENGTH_SLOT),
            block_content_length: slot(CONTENT_LENGTH_SLOT),
            previous_block_id: block_ref(PREVIOUS_SLOT, "previous block id")?,
            is_deleted,
        })
    }
}
