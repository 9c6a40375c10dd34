//! Error types for image loading and handoff

use core::fmt;

use crate::memory::AddressRange;

/// Result type for boot operations
pub type Result<T> = core::result::Result<T, BootError>;

/// Value returned by the load entry points when any step before the jump
/// into the loaded image failed.
pub const BOOT_FAILED: i32 = -1;

/// Why an image was judged malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidImageReason {
    /// Buffer is shorter than the fixed ELF64 header
    TruncatedHeader,
    /// Program-header table extends past the end of the buffer
    ProgramHeadersOutOfBounds,
    /// A LOAD entry declares less memory than file bytes
    MemorySmallerThanFile,
    /// A LOAD entry's file bytes lie outside the buffer
    SegmentOutOfBounds,
    /// Destination range wraps the address space
    AddressOverflow,
    /// Flat image is too short to hold its entry offset
    TruncatedFlatHeader,
    /// Flat image entry offset points past the end of the image
    EntryOutOfBounds,
}

/// Why a recognised image format cannot be booted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// ELF class byte other than 64-bit
    Class(u8),
    /// ELF data encoding other than little endian
    Endianness(u8),
    /// Program-header entry size other than 56 bytes
    ProgramHeaderSize(u16),
    /// Format has no calling shape on this path
    NotBootableHere,
}

/// Errors that can occur while loading or handing off to an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// No known magic matches
    UnrecognizedFormat,

    /// Known magic, unsupported variant
    UnsupportedFormat(UnsupportedReason),

    /// Header or segment table is malformed
    InvalidImage(InvalidImageReason),

    /// Provisioner could not grant the range
    AllocationFailure { range: AddressRange },

    /// Provisioner granted a different base than requested
    AddressMismatch { requested: u64, granted: u64 },

    /// Memory map snapshot could not be taken
    MemoryMap(usize),

    /// Firmware refused to end boot services
    RelinquishFailure(usize),

    /// Kernel or font file could not be read
    FileRead(usize),

    /// Font file failed validation
    InvalidFont,

    /// Entry dispatch is not available on this architecture
    UnsupportedArchitecture,
}

impl fmt::Display for InvalidImageReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedHeader => write!(f, "buffer shorter than ELF64 header"),
            Self::ProgramHeadersOutOfBounds => write!(f, "program headers extend past end of image"),
            Self::MemorySmallerThanFile => write!(f, "segment memory size smaller than file size"),
            Self::SegmentOutOfBounds => write!(f, "segment file data extends past end of image"),
            Self::AddressOverflow => write!(f, "segment address range overflows"),
            Self::TruncatedFlatHeader => write!(f, "flat image shorter than its header"),
            Self::EntryOutOfBounds => write!(f, "entry point outside of image"),
        }
    }
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, "ELF class {} (only 64-bit is supported)", class),
            Self::Endianness(data) => write!(f, "ELF data encoding {} (only little endian is supported)", data),
            Self::ProgramHeaderSize(size) => write!(f, "program header entry size {}", size),
            Self::NotBootableHere => write!(f, "format cannot be started on this boot path"),
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedFormat => write!(f, "Unrecognized image format"),
            Self::UnsupportedFormat(reason) => write!(f, "Unsupported image format: {}", reason),
            Self::InvalidImage(reason) => write!(f, "Invalid image: {}", reason),
            Self::AllocationFailure { range } => {
                write!(f, "Failed to provision {:#x}..{:#x}", range.start(), range.end())
            }
            Self::AddressMismatch { requested, granted } => write!(
                f,
                "Provisioner granted {:#x} instead of {:#x}",
                granted, requested
            ),
            Self::MemoryMap(status) => write!(f, "Memory map snapshot failed (status {:#x})", status),
            Self::RelinquishFailure(status) => {
                write!(f, "Exiting boot services failed (status {:#x})", status)
            }
            Self::FileRead(status) => write!(f, "File read failed (status {:#x})", status),
            Self::InvalidFont => write!(f, "Invalid PSF1 font"),
            Self::UnsupportedArchitecture => write!(f, "Entry dispatch unsupported on this architecture"),
        }
    }
}

impl From<InvalidImageReason> for BootError {
    fn from(reason: InvalidImageReason) -> Self {
        Self::InvalidImage(reason)
    }
}

impl From<UnsupportedReason> for BootError {
    fn from(reason: UnsupportedReason) -> Self {
        Self::UnsupportedFormat(reason)
    }
}
