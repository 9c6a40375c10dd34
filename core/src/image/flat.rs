//! Flat x86-64 kernels.
//!
//! The image is executed where it already sits in memory. Its only header
//! fields are the `0x8664` tag at offset 0 and a 16-bit entry offset at
//! 0x24, both little endian.

use super::FLAT_X86_64_MAGIC;
use crate::error::{InvalidImageReason, Result};

/// File offset of the little-endian entry offset
pub const FLAT_ENTRY_OFFSET: usize = 0x24;

#[derive(Debug, Clone, Copy)]
pub struct FlatImage<'a> {
    bytes: &'a [u8],
    entry_offset: u16,
}

impl<'a> FlatImage<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < FLAT_ENTRY_OFFSET + 2
            || u16::from_le_bytes([bytes[0], bytes[1]]) != FLAT_X86_64_MAGIC
        {
            return Err(InvalidImageReason::TruncatedFlatHeader.into());
        }

        let entry_offset =
            u16::from_le_bytes([bytes[FLAT_ENTRY_OFFSET], bytes[FLAT_ENTRY_OFFSET + 1]]);
        if entry_offset as usize >= bytes.len() {
            return Err(InvalidImageReason::EntryOutOfBounds.into());
        }

        Ok(Self {
            bytes,
            entry_offset,
        })
    }

    /// Entry point relative to the start of the image.
    pub fn entry_offset(&self) -> u16 {
        self.entry_offset
    }

    /// Absolute entry address of the image where it currently lives.
    pub fn entry_address(&self) -> u64 {
        self.bytes.as_ptr() as u64 + self.entry_offset as u64
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}
