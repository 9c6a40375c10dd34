//! GOP (Graphics Output Protocol) query for framebuffer info.

use lodestar_core::handoff::GraphicsDescriptor;
use uguid::{guid, Guid};

use crate::{BootServices, EFI_SUCCESS};

pub const GRAPHICS_OUTPUT_PROTOCOL_GUID: Guid = guid!("9042a9de-23dc-4a38-96fb-7aded080516a");

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GopPixelFormat {
    Rgbx = 0,
    Bgrx = 1,
    BitMask = 2,
    /// No direct framebuffer access
    BltOnly = 3,
}

#[repr(C)]
pub struct GopModeInfo {
    pub version: u32,
    pub horizontal_resolution: u32,
    pub vertical_resolution: u32,
    pub pixel_format: GopPixelFormat,
    pub pixel_information: [u32; 4],
    pub pixels_per_scan_line: u32,
}

#[repr(C)]
pub struct GopMode {
    pub max_mode: u32,
    pub mode: u32,
    pub info: *const GopModeInfo,
    pub size_of_info: usize,
    pub frame_buffer_base: u64,
    pub frame_buffer_size: usize,
}

#[repr(C)]
pub struct GraphicsOutputProtocol {
    pub query_mode: usize,
    pub set_mode: usize,
    pub blt: usize,
    pub mode: *mut GopMode,
}

/// Framebuffer of the current GOP mode, or `None` when there is no GOP or
/// the mode has no linear framebuffer.
///
/// # Safety
/// Must be called before ExitBootServices.
pub unsafe fn query(bs: &BootServices) -> Option<GraphicsDescriptor> {
    let mut gop_ptr: *mut core::ffi::c_void = core::ptr::null_mut();
    let status = (bs.locate_protocol)(
        &GRAPHICS_OUTPUT_PROTOCOL_GUID,
        core::ptr::null(),
        &mut gop_ptr,
    );
    if status != EFI_SUCCESS || gop_ptr.is_null() {
        return None;
    }

    let gop = &*(gop_ptr as *const GraphicsOutputProtocol);
    if gop.mode.is_null() {
        return None;
    }
    let mode = &*gop.mode;
    if mode.info.is_null() {
        return None;
    }
    let info = &*mode.info;
    if info.pixel_format == GopPixelFormat::BltOnly {
        return None;
    }

    Some(GraphicsDescriptor {
        base: mode.frame_buffer_base,
        size: mode.frame_buffer_size as u64,
        width: info.horizontal_resolution,
        height: info.vertical_resolution,
        pixels_per_scanline: info.pixels_per_scan_line,
    })
}
