//! `BootEnvironment` over UEFI boot services.

use core::ffi::c_void;

use lodestar_core::error::{BootError, Result};
use lodestar_core::handoff::{
    BootEnvironment, GraphicsDescriptor, MapKey, MemoryMapSnapshot, RuntimeServicesHandle,
};
use lodestar_core::logger;

use crate::memory::MemoryMap;
use crate::{console, fs, gop, BootServices, SystemTable, EFI_SUCCESS};

pub struct FirmwareEnvironment<'a> {
    image_handle: *mut c_void,
    system_table: &'a SystemTable,
    memory_map: MemoryMap,
}

impl<'a> FirmwareEnvironment<'a> {
    pub fn new(image_handle: *mut c_void, system_table: &'a SystemTable) -> Self {
        Self {
            image_handle,
            system_table,
            memory_map: MemoryMap::new(),
        }
    }

    fn boot_services(&self) -> &'a BootServices {
        // SAFETY: the system table outlives this environment and boot services
        // stay valid until `relinquish` succeeds
        unsafe { &*self.system_table.boot_services }
    }
}

impl BootEnvironment for FirmwareEnvironment<'_> {
    fn read_file(&mut self, path: &str, limit: usize) -> Result<&'static [u8]> {
        // SAFETY: boot services are live until relinquish
        unsafe { fs::read_file(self.boot_services(), self.image_handle, path, limit) }
    }

    fn graphics(&mut self) -> GraphicsDescriptor {
        // SAFETY: boot services are live until relinquish
        match unsafe { gop::query(self.boot_services()) } {
            Some(graphics) => graphics,
            None => {
                log::warn!("no linear framebuffer");
                GraphicsDescriptor::default()
            }
        }
    }

    fn runtime_services(&self) -> RuntimeServicesHandle {
        RuntimeServicesHandle::new(self.system_table.runtime_services as *const c_void)
    }

    fn get_memory_map(&mut self) -> Result<MemoryMapSnapshot> {
        let bs = self.boot_services();
        // SAFETY: boot services are live until relinquish
        let snapshot = unsafe { self.memory_map.snapshot(bs) }.map_err(BootError::MemoryMap)?;
        Ok(snapshot)
    }

    fn relinquish(&mut self, key: MapKey) -> Result<()> {
        let bs = self.boot_services();
        let image_handle = self.image_handle;
        end_boot_services(|| (bs.exit_boot_services)(image_handle, key.0))
    }
}

/// Silence the console for good, then call `exit`.
///
/// Writing to the console between the snapshot and ExitBootServices can
/// change the map key. Once ExitBootServices has been called, even a failed
/// one, only memory services may be used, so the console stays detached and
/// later lines only reach the ring buffer.
fn end_boot_services<F>(exit: F) -> Result<()>
where
    F: FnOnce() -> usize,
{
    logger::detach_sink();
    console::detach();
    let status = exit();
    if status != EFI_SUCCESS {
        return Err(BootError::RelinquishFailure(status));
    }
    Ok(())
}
