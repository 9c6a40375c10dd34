//! Anonymous `mmap` provisioner for the hosted path.
//!
//! Raw syscalls, so the crate needs no libc binding. Linux x86-64 only;
//! elsewhere every request fails with `ENOSYS`.

use lodestar_core::memory::{
    AddressRange, MemoryProvisioner, ProvisionError, ProvisionLedger, ProvisionRequest,
};

pub const PAGE_SIZE: u64 = 4096;

const PROT_READ: u64 = 0x1;
const PROT_WRITE: u64 = 0x2;
const PROT_EXEC: u64 = 0x4;
const MAP_PRIVATE: u64 = 0x02;
const MAP_ANONYMOUS: u64 = 0x20;
/// Exact placement or `EEXIST`. Kernels before 4.17 treat it as a hint,
/// hence the address check after every call.
const MAP_FIXED_NOREPLACE: u64 = 0x10_0000;

const EEXIST: i64 = 17;
const ENOMEM: i64 = 12;
#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
const ENOSYS: i64 = 38;

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
mod sys {
    use core::arch::asm;

    pub const SYS_MMAP: u64 = 9;
    pub const SYS_MUNMAP: u64 = 11;

    /// Raw return value: an address, or `-errno` in `[-4095, -1]`.
    #[inline]
    pub unsafe fn syscall6(nr: u64, a1: u64, a2: u64, a3: u64, a4: u64, a5: u64, a6: u64) -> i64 {
        let ret: i64;
        asm!(
            "syscall",
            inout("rax") nr => ret,
            in("rdi") a1,
            in("rsi") a2,
            in("rdx") a3,
            in("r10") a4,
            in("r8") a5,
            in("r9") a6,
            out("rcx") _,
            out("r11") _,
            options(nostack, preserves_flags)
        );
        ret
    }

    pub unsafe fn syscall2(nr: u64, a1: u64, a2: u64) -> i64 {
        let ret: i64;
        asm!(
            "syscall",
            inout("rax") nr => ret,
            in("rdi") a1,
            in("rsi") a2,
            out("rcx") _,
            out("r11") _,
            options(nostack, preserves_flags)
        );
        ret
    }
}

fn errno_of(ret: i64) -> Option<i64> {
    (-4095..0).contains(&ret).then_some(-ret)
}

/// Map `range` read/write/execute at exactly its start. Returns the base the
/// kernel chose.
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
unsafe fn map_anonymous(range: AddressRange) -> Result<u64, i64> {
    let ret = sys::syscall6(
        sys::SYS_MMAP,
        range.start(),
        range.len(),
        PROT_READ | PROT_WRITE | PROT_EXEC,
        MAP_PRIVATE | MAP_ANONYMOUS | MAP_FIXED_NOREPLACE,
        u64::MAX,
        0,
    );
    match errno_of(ret) {
        Some(errno) => Err(errno),
        None => Ok(ret as u64),
    }
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
unsafe fn map_anonymous(_range: AddressRange) -> Result<u64, i64> {
    Err(ENOSYS)
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
unsafe fn unmap(base: u64, len: u64) {
    sys::syscall2(sys::SYS_MUNMAP, base, len);
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
unsafe fn unmap(_base: u64, _len: u64) {}

/// Backs each segment with a private anonymous mapping at its own address.
///
/// Mappings live until the process exits.
#[derive(Debug)]
pub struct HostProvisioner {
    granularity: u64,
    ledger: ProvisionLedger,
}

impl HostProvisioner {
    /// `granularity` is used for rounding segment bases; mappings themselves
    /// are always whole pages.
    pub fn new(granularity: u64) -> Self {
        Self {
            granularity,
            ledger: ProvisionLedger::new(),
        }
    }

    pub fn mapped(&self) -> &[AddressRange] {
        self.ledger.granted()
    }
}

impl MemoryProvisioner for HostProvisioner {
    fn granularity(&self) -> u64 {
        self.granularity
    }

    fn allocate(&mut self, request: &ProvisionRequest) -> Result<u64, ProvisionError> {
        let pages = request
            .range
            .round_out(PAGE_SIZE.max(self.granularity))
            .ok_or(ProvisionError::AddressUnavailable)?;

        for piece in self.ledger.uncovered(pages) {
            // SAFETY: NOREPLACE never clobbers an existing mapping
            let granted = unsafe { map_anonymous(piece) }.map_err(|errno| match errno {
                EEXIST => ProvisionError::AddressUnavailable,
                ENOMEM => ProvisionError::OutOfMemory,
                other => ProvisionError::Os(other),
            })?;
            if granted != piece.start() {
                // SAFETY: the mapping was just created and nothing refers to it
                unsafe { unmap(granted, piece.len()) };
                return Ok(granted);
            }
            log::debug!("mapped {:#x}..{:#x}", piece.start(), piece.end());
            self.ledger.record(piece);
        }

        Ok(request.range.start())
    }
}
