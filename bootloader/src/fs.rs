// Files from the volume the bootloader was started from

use core::ffi::c_void;
use core::ptr;

use lodestar_core::error::{BootError, Result};
use uguid::{guid, Guid};

use crate::memory::PAGE_SIZE;
use crate::{BootServices, EFI_INVALID_PARAMETER, EFI_SUCCESS};

pub const LOADED_IMAGE_PROTOCOL_GUID: Guid = guid!("5b1b31a1-9562-11d2-8e3f-00a0c969723b");
pub const SIMPLE_FILE_SYSTEM_PROTOCOL_GUID: Guid = guid!("964e5b22-6459-11d2-8e39-00a0c969723b");

pub const EFI_FILE_MODE_READ: u64 = 0x0000000000000001;

const EFI_ALLOCATE_ANY_PAGES: usize = 0;
const EFI_LOADER_DATA: usize = 2;
const MAX_PATH: usize = 256;

#[repr(C)]
pub struct LoadedImageProtocol {
    revision: u32,
    parent_handle: *mut c_void,
    system_table: *mut c_void,
    pub device_handle: *mut c_void,
    file_path: *mut c_void,
    _reserved: *mut c_void,
    load_options_size: u32,
    load_options: *mut c_void,
    pub image_base: *mut c_void,
    pub image_size: u64,
    image_code_type: u32,
    image_data_type: u32,
    unload: usize,
}

#[repr(C)]
pub struct SimpleFileSystemProtocol {
    revision: u64,
    pub open_volume: extern "efiapi" fn(
        this: *mut SimpleFileSystemProtocol,
        root: *mut *mut FileProtocol,
    ) -> usize,
}

#[repr(C)]
pub struct FileProtocol {
    revision: u64,
    pub open: extern "efiapi" fn(
        this: *mut FileProtocol,
        new_handle: *mut *mut FileProtocol,
        file_name: *const u16,
        open_mode: u64,
        attributes: u64,
    ) -> usize,
    pub close: extern "efiapi" fn(this: *mut FileProtocol) -> usize,
    pub delete: usize,
    pub read: extern "efiapi" fn(
        this: *mut FileProtocol,
        buffer_size: *mut usize,
        buffer: *mut u8,
    ) -> usize,
    pub write: usize,
    pub get_position: extern "efiapi" fn(this: *mut FileProtocol, position: *mut u64) -> usize,
    pub set_position: extern "efiapi" fn(this: *mut FileProtocol, position: u64) -> usize,
    pub get_info: usize,
    pub set_info: usize,
    pub flush: usize,
}

/// Null-terminated UTF-16 copy of an ASCII path, with `/` turned into `\`.
/// Returns the length including the terminator.
pub fn ascii_to_utf16(ascii: &str, buf: &mut [u16]) -> usize {
    let mut i = 0;
    for byte in ascii.bytes() {
        if i >= buf.len() - 1 {
            break;
        }
        buf[i] = if byte == b'/' { b'\\' as u16 } else { byte as u16 };
        i += 1;
    }
    buf[i] = 0;
    i + 1
}

fn check(status: usize) -> Result<()> {
    if status == EFI_SUCCESS {
        Ok(())
    } else {
        Err(BootError::FileRead(status))
    }
}

/// Closes the handle when dropped.
struct OpenFile(*mut FileProtocol);

impl Drop for OpenFile {
    fn drop(&mut self) {
        // SAFETY: handle came from a successful open and is closed once
        unsafe {
            ((*self.0).close)(self.0);
        }
    }
}

/// Root directory of the boot volume.
///
/// # Safety
/// Boot services must be live and `image_handle` must be our own image.
unsafe fn open_boot_volume(bs: &BootServices, image_handle: *mut c_void) -> Result<OpenFile> {
    let mut loaded_image: *mut c_void = ptr::null_mut();
    check((bs.handle_protocol)(
        image_handle,
        &LOADED_IMAGE_PROTOCOL_GUID,
        &mut loaded_image,
    ))?;
    let device = (*(loaded_image as *const LoadedImageProtocol)).device_handle;

    let mut fs: *mut c_void = ptr::null_mut();
    check((bs.handle_protocol)(
        device,
        &SIMPLE_FILE_SYSTEM_PROTOCOL_GUID,
        &mut fs,
    ))?;
    let fs = fs as *mut SimpleFileSystemProtocol;

    let mut root: *mut FileProtocol = ptr::null_mut();
    check(((*fs).open_volume)(fs, &mut root))?;
    Ok(OpenFile(root))
}

unsafe fn file_size(file: &OpenFile) -> Result<u64> {
    // Seeking to the all-ones position moves to end of file
    check(((*file.0).set_position)(file.0, u64::MAX))?;
    let mut size = 0u64;
    check(((*file.0).get_position)(file.0, &mut size))?;
    check(((*file.0).set_position)(file.0, 0))?;
    Ok(size)
}

/// Read a whole file into freshly allocated LOADER_DATA pages.
///
/// The pages are never freed: they outlive boot services and the returned
/// slice stays valid for the rest of the boot.
///
/// # Safety
/// Boot services must be live and `image_handle` must be our own image.
pub unsafe fn read_file(
    bs: &BootServices,
    image_handle: *mut c_void,
    path: &str,
    limit: usize,
) -> Result<&'static [u8]> {
    let root = open_boot_volume(bs, image_handle)?;

    let mut name = [0u16; MAX_PATH];
    ascii_to_utf16(path, &mut name);
    let mut handle: *mut FileProtocol = ptr::null_mut();
    check(((*root.0).open)(
        root.0,
        &mut handle,
        name.as_ptr(),
        EFI_FILE_MODE_READ,
        0,
    ))?;
    let file = OpenFile(handle);

    let size = file_size(&file)?;
    if size > limit as u64 {
        log::warn!("{} is {} bytes, limit is {}", path, size, limit);
        return Err(BootError::FileRead(EFI_INVALID_PARAMETER));
    }
    let size = size as usize;
    if size == 0 {
        return Ok(&[]);
    }

    let mut base: u64 = 0;
    check((bs.allocate_pages)(
        EFI_ALLOCATE_ANY_PAGES,
        EFI_LOADER_DATA,
        size.div_ceil(PAGE_SIZE),
        &mut base,
    ))?;
    let buffer = core::slice::from_raw_parts_mut(base as *mut u8, size);

    let mut filled = 0;
    while filled < size {
        let mut chunk = size - filled;
        check(((*file.0).read)(file.0, &mut chunk, buffer[filled..].as_mut_ptr()))?;
        if chunk == 0 {
            // File shrank under us
            return Err(BootError::FileRead(EFI_INVALID_PARAMETER));
        }
        filled += chunk;
    }

    log::debug!("{} placed at {:#x}", path, base);
    Ok(buffer)
}
