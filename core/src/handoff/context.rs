//! Structures handed to a kernel started on the firmware path.
//!
//! Field order and widths are fixed: the kernel reads these through a raw
//! pointer.

use core::ffi::c_void;
use core::ptr;

use crate::font::{Psf1Font, Psf1Header};

/// Pointer to the firmware runtime services table, the only firmware
/// interface still valid once boot services are gone.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeServicesHandle(*const c_void);

impl RuntimeServicesHandle {
    pub const fn new(table: *const c_void) -> Self {
        Self(table)
    }

    pub const fn null() -> Self {
        Self(ptr::null())
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.0
    }
}

/// Opaque token identifying one memory map snapshot. Relinquishing with a
/// stale key fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapKey(pub usize);

/// Memory map as the kernel sees it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMapInfo {
    pub descriptors: *const u8,
    pub map_size: usize,
    pub descriptor_size: usize,
    pub descriptor_version: u32,
}

impl MemoryMapInfo {
    pub fn descriptor_count(&self) -> usize {
        if self.descriptor_size == 0 {
            0
        } else {
            self.map_size / self.descriptor_size
        }
    }
}

/// Result of `BootEnvironment::get_memory_map`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMapSnapshot {
    pub info: MemoryMapInfo,
    pub key: MapKey,
}

/// Linear framebuffer, 32 bits per pixel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphicsDescriptor {
    pub base: u64,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub pixels_per_scanline: u32,
}

/// Console font as the kernel sees it. `glyphs` is null when no font was
/// loaded.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontDescriptor {
    pub header: Psf1Header,
    pub scale: i32,
    pub glyphs: *const u8,
}

impl FontDescriptor {
    pub const fn none() -> Self {
        Self {
            header: Psf1Header {
                magic: [0; 2],
                mode: 0,
                height: 0,
            },
            scale: 1,
            glyphs: ptr::null(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.glyphs.is_null()
    }
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Psf1Font<'_>> for FontDescriptor {
    fn from(font: Psf1Font<'_>) -> Self {
        Self {
            header: font.header(),
            scale: 1,
            glyphs: font.glyphs().as_ptr(),
        }
    }
}

/// Everything the kernel receives, by pointer, as its only argument.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HandoffContext {
    pub runtime_services: RuntimeServicesHandle,
    pub memory: MemoryMapInfo,
    pub graphics: GraphicsDescriptor,
    pub font: FontDescriptor,
}
