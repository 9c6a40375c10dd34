//! Firmware handoff.
//!
//! The firmware path reads its files, learns the framebuffer and finally
//! ends boot services through a [`BootEnvironment`]. The UEFI bootloader
//! implements it over boot services; tests implement it with fakes.

pub mod builder;
pub mod context;

pub use builder::HandoffBuilder;
pub use context::{
    FontDescriptor, GraphicsDescriptor, HandoffContext, MapKey, MemoryMapInfo,
    MemoryMapSnapshot, RuntimeServicesHandle,
};

use crate::error::Result;

/// Boot-time services the firmware path needs, called in this order:
/// `read_file`, `graphics`, `runtime_services`, `get_memory_map`,
/// `relinquish`.
pub trait BootEnvironment {
    /// Read a whole file from the boot volume, at most `limit` bytes.
    ///
    /// The buffer must stay valid after boot services end: a flat kernel
    /// runs from it and font glyphs are handed over by pointer.
    fn read_file(&mut self, path: &str, limit: usize) -> Result<&'static [u8]>;

    fn graphics(&mut self) -> GraphicsDescriptor;

    fn runtime_services(&self) -> RuntimeServicesHandle;

    /// Take a memory map snapshot. Must not allocate from the map it
    /// describes once the snapshot is taken.
    fn get_memory_map(&mut self) -> Result<MemoryMapSnapshot>;

    /// End boot services. Called once, immediately after
    /// [`get_memory_map`](Self::get_memory_map), with the snapshot's key.
    fn relinquish(&mut self, key: MapKey) -> Result<()>;
}
