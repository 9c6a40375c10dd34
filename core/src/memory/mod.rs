//! Memory provisioning for loaded segments.
//!
//! The loader never maps memory itself. It asks a [`MemoryProvisioner`] for
//! each segment's range: anonymous `mmap` on a hosted target, page
//! allocation at a fixed address under firmware.

pub mod ledger;
pub mod range;

pub use ledger::ProvisionLedger;
pub use range::{align_down, align_up, AddressRange};

use core::fmt;

/// One request per LOAD segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Range to back with read/write/execute memory. Its start is already
    /// rounded down to the provisioner's granularity.
    pub range: AddressRange,
    /// Alignment the segment declares (`p_align`), informational.
    pub alignment: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionError {
    /// Nothing left to hand out
    OutOfMemory,
    /// Requested address is taken or outside what the platform can map
    AddressUnavailable,
    /// Firmware returned an error status
    Firmware(usize),
    /// Host kernel returned an error number
    Os(i64),
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::AddressUnavailable => write!(f, "address unavailable"),
            Self::Firmware(status) => write!(f, "firmware status {:#x}", status),
            Self::Os(errno) => write!(f, "errno {}", errno),
        }
    }
}

/// Source of memory for loaded segments.
pub trait MemoryProvisioner {
    /// Minimum size and alignment unit this provisioner grants. Segment
    /// bases are rounded down to a multiple of it; it need not be a power of
    /// two, and zero is treated as one.
    fn granularity(&self) -> u64;

    /// Back `request.range` with read/write/execute memory and return the
    /// base actually granted. Anything other than `request.range.start()` is
    /// treated as a failure by the loader.
    fn allocate(&mut self, request: &ProvisionRequest) -> Result<u64, ProvisionError>;

    /// Writable view of `range`.
    ///
    /// The default treats addresses as directly addressable, which holds for
    /// identity-mapped firmware memory and for host mappings.
    ///
    /// # Safety
    /// `range` must lie inside memory previously granted by
    /// [`allocate`](Self::allocate) and nothing else may alias it.
    unsafe fn destination(&mut self, range: AddressRange) -> &mut [u8] {
        if range.is_empty() {
            return &mut [];
        }
        core::slice::from_raw_parts_mut(range.start() as *mut u8, range.len() as usize)
    }
}
