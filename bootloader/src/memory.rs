// Memory map snapshot buffer

use core::ptr;

use lodestar_core::handoff::{MapKey, MemoryMapInfo, MemoryMapSnapshot};

use crate::{BootServices, EFI_BUFFER_TOO_SMALL, EFI_SUCCESS};

pub const PAGE_SIZE: usize = 4096;
const EFI_ALLOCATE_ANY_PAGES: usize = 0;
const EFI_LOADER_DATA: usize = 2;

/// Extra descriptors reserved on top of what the firmware reports, since
/// allocating the buffer can itself split a region.
const SLACK_DESCRIPTORS: usize = 2;

/// Page-backed buffer the firmware writes its memory map into.
///
/// Lives in LOADER_DATA pages, so the kernel can keep reading the map after
/// boot services are gone.
pub struct MemoryMap {
    buffer: *mut u8,
    capacity: usize,
    size: usize,
    map_key: usize,
    descriptor_size: usize,
    descriptor_version: u32,
}

impl MemoryMap {
    pub const fn new() -> Self {
        Self {
            buffer: ptr::null_mut(),
            capacity: 0,
            size: 0,
            map_key: 0,
            descriptor_size: 0,
            descriptor_version: 0,
        }
    }

    /// Take a fresh snapshot, growing the buffer first if needed. The
    /// returned key is valid until the next firmware allocation.
    pub unsafe fn snapshot(&mut self, bs: &BootServices) -> Result<MemoryMapSnapshot, usize> {
        if self.buffer.is_null() {
            self.bootstrap(bs)?;
        }

        loop {
            let mut reported_size = self.capacity;
            let status = (bs.get_memory_map)(
                &mut reported_size,
                self.buffer,
                &mut self.map_key,
                &mut self.descriptor_size,
                &mut self.descriptor_version,
            );

            if status == EFI_SUCCESS {
                self.size = reported_size;
                return Ok(MemoryMapSnapshot {
                    info: MemoryMapInfo {
                        descriptors: self.buffer,
                        map_size: self.size,
                        descriptor_size: self.descriptor_size,
                        descriptor_version: self.descriptor_version,
                    },
                    key: MapKey(self.map_key),
                });
            }

            if status == EFI_BUFFER_TOO_SMALL {
                let needed = reported_size + self.descriptor_size * SLACK_DESCRIPTORS;
                self.reserve(bs, needed)?;
                continue;
            }

            return Err(status);
        }
    }

    unsafe fn bootstrap(&mut self, bs: &BootServices) -> Result<(), usize> {
        let mut needed = 0usize;
        let mut map_key = 0usize;
        let mut descriptor_size = 0usize;
        let mut descriptor_version = 0u32;

        let status = (bs.get_memory_map)(
            &mut needed,
            ptr::null_mut(),
            &mut map_key,
            &mut descriptor_size,
            &mut descriptor_version,
        );
        if status != EFI_BUFFER_TOO_SMALL {
            return Err(status);
        }

        self.descriptor_size = descriptor_size;
        self.descriptor_version = descriptor_version;
        self.reserve(bs, needed + descriptor_size * SLACK_DESCRIPTORS)
    }

    // Old buffers are leaked; freeing them would change the map again.
    unsafe fn reserve(&mut self, bs: &BootServices, bytes: usize) -> Result<(), usize> {
        let pages = bytes.div_ceil(PAGE_SIZE);
        let mut base: u64 = 0;
        let status = (bs.allocate_pages)(EFI_ALLOCATE_ANY_PAGES, EFI_LOADER_DATA, pages, &mut base);
        if status != EFI_SUCCESS {
            return Err(status);
        }
        self.buffer = base as *mut u8;
        self.capacity = pages * PAGE_SIZE;
        self.size = 0;
        Ok(())
    }
}
