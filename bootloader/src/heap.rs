//! Bootloader heap.
//!
//! A fixed block of LOADER_DATA pages taken at start-up. The pages stay
//! ours after ExitBootServices, so the heap keeps working across the
//! handoff.

use linked_list_allocator::LockedHeap;

use crate::{BootServices, EFI_SUCCESS};

pub const HEAP_PAGES: usize = 256;
pub const HEAP_SIZE: usize = HEAP_PAGES * 4096;

const EFI_ALLOCATE_ANY_PAGES: usize = 0;
const EFI_LOADER_DATA: usize = 2;

#[cfg_attr(target_os = "uefi", global_allocator)]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Reserve the heap pages and hand them to the allocator.
///
/// # Safety
/// Boot services must be live. Call once, before the first allocation.
pub unsafe fn init(bs: &BootServices) -> Result<(), usize> {
    let mut base: u64 = 0;
    let status = (bs.allocate_pages)(EFI_ALLOCATE_ANY_PAGES, EFI_LOADER_DATA, HEAP_PAGES, &mut base);
    if status != EFI_SUCCESS {
        return Err(status);
    }
    ALLOCATOR.lock().init(base as *mut u8, HEAP_SIZE);
    Ok(())
}
