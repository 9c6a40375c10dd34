//! Kernel image formats.
//!
//! Two formats are bootable:
//! 1. ELF64 executables, loaded segment by segment
//! 2. Flat x86-64 binaries tagged `0x8664`, run in place from the buffer
//!
//! [`detect`] only looks at magic bytes. It never allocates and never
//! touches anything outside the slice it is given.

pub mod elf;
pub mod flat;

pub use elf::{ElfHeader, ElfImage, ProgramHeader, ProgramHeaders, SegmentFlags};
pub use flat::FlatImage;

use crate::error::{BootError, Result, UnsupportedReason};

/// ELF magic: 0x7F 'E' 'L' 'F'
pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// ELF class byte: 32-bit
pub const ELFCLASS32: u8 = 1;

/// ELF class byte: 64-bit
pub const ELFCLASS64: u8 = 2;

/// Little-endian tag at offset 0 of a flat x86-64 kernel
pub const FLAT_X86_64_MAGIC: u16 = 0x8664;

/// Detection reads at most this many bytes.
pub const DETECT_MIN_LEN: usize = 0x28;

/// Outcome of [`detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// ELF magic with 64-bit class
    Elf64,
    /// ELF magic with any other class byte
    UnsupportedElf { class: u8 },
    /// Flat x86-64 binary, entry offset at 0x24
    FlatX86_64,
    /// Nothing matched
    Unrecognized,
}

impl ImageFormat {
    /// Turn rejected outcomes into the error the boot paths report.
    pub fn bootable(self) -> Result<Self> {
        match self {
            Self::Elf64 | Self::FlatX86_64 => Ok(self),
            Self::UnsupportedElf { class } => Err(UnsupportedReason::Class(class).into()),
            Self::Unrecognized => Err(BootError::UnrecognizedFormat),
        }
    }
}

/// Classify a raw image by its leading bytes.
pub fn detect(image: &[u8]) -> ImageFormat {
    if image.len() < DETECT_MIN_LEN {
        return ImageFormat::Unrecognized;
    }

    if image[..4] == ELF_MAGIC {
        return match image[4] {
            ELFCLASS64 => ImageFormat::Elf64,
            class => ImageFormat::UnsupportedElf { class },
        };
    }

    if u16::from_le_bytes([image[0], image[1]]) == FLAT_X86_64_MAGIC {
        return ImageFormat::FlatX86_64;
    }

    ImageFormat::Unrecognized
}
