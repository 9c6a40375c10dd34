//! Lodestar UEFI Bootloader
//!
//! Reads `\kernel` (and optionally `\default-font.psf`) from the volume the
//! bootloader itself was started from, loads it and hands over.
//! UEFI is only used to:
//! 1. Read files and allocate pages for the kernel
//! 2. Query the GOP framebuffer
//! 3. Take the memory map and call ExitBootServices
//!
//! Everything after that belongs to the kernel.

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]
#![cfg_attr(not(target_os = "uefi"), allow(dead_code))]

mod console;
mod firmware;
mod fs;
mod gop;
mod heap;
mod memory;
mod provision;

use core::ffi::c_void;

use uguid::Guid;

#[repr(C)]
pub struct SimpleTextOutputProtocol {
    reset: extern "efiapi" fn(*mut SimpleTextOutputProtocol, bool) -> usize,
    output_string: extern "efiapi" fn(*mut SimpleTextOutputProtocol, *const u16) -> usize,
    test_string: usize,
    query_mode: usize,
    set_mode: usize,
    set_attribute: extern "efiapi" fn(*mut SimpleTextOutputProtocol, usize) -> usize,
    clear_screen: extern "efiapi" fn(*mut SimpleTextOutputProtocol) -> usize,
}

#[repr(C)]
pub struct SystemTable {
    _header: [u8; 24],
    _firmware_vendor: *const u16,
    _firmware_revision: u32,
    _console_in_handle: *const (),
    _con_in: *const (),
    _console_out_handle: *const (),
    con_out: *mut SimpleTextOutputProtocol,
    _stderr_handle: *const (),
    _stderr: *const (),
    runtime_services: *const RuntimeServices,
    boot_services: *const BootServices,
    _number_of_table_entries: usize,
    _configuration_table: *const (),
}

/// Only forwarded to the kernel, never called from here.
#[repr(C)]
pub struct RuntimeServices {
    _header: [u8; 24],
}

#[repr(C)]
pub struct BootServices {
    _header: [u8; 24],
    // Task Priority Services
    _raise_tpl: usize,
    _restore_tpl: usize,
    // Memory Services
    pub allocate_pages: extern "efiapi" fn(
        allocate_type: usize,
        memory_type: usize,
        pages: usize,
        memory: *mut u64,
    ) -> usize,
    pub free_pages: extern "efiapi" fn(memory: u64, pages: usize) -> usize,
    pub get_memory_map: extern "efiapi" fn(
        memory_map_size: *mut usize,
        memory_map: *mut u8,
        map_key: *mut usize,
        descriptor_size: *mut usize,
        descriptor_version: *mut u32,
    ) -> usize,
    _allocate_pool: usize,
    _free_pool: usize,
    // Event & Timer Services
    _create_event: usize,
    _set_timer: usize,
    _wait_for_event: usize,
    _signal_event: usize,
    _close_event: usize,
    _check_event: usize,
    // Protocol Handler Services
    _install_protocol_interface: usize,
    _reinstall_protocol_interface: usize,
    _uninstall_protocol_interface: usize,
    pub handle_protocol: extern "efiapi" fn(
        handle: *mut c_void,
        protocol: *const Guid,
        interface: *mut *mut c_void,
    ) -> usize,
    _reserved: usize,
    _register_protocol_notify: usize,
    _locate_handle: usize,
    _locate_device_path: usize,
    _install_configuration_table: usize,
    // Image Services
    _load_image: usize,
    _start_image: usize,
    _exit: usize,
    _unload_image: usize,
    pub exit_boot_services: extern "efiapi" fn(image_handle: *mut c_void, map_key: usize) -> usize,
    // Miscellaneous Services
    _get_next_monotonic_count: usize,
    _stall: usize,
    /// Disable/set watchdog timer (timeout in seconds, 0 = disable)
    pub set_watchdog_timer: extern "efiapi" fn(
        timeout: usize,
        watchdog_code: u64,
        data_size: usize,
        watchdog_data: *const u16,
    ) -> usize,
    // Driver Support Services
    _connect_controller: usize,
    _disconnect_controller: usize,
    // Open/Close Protocol Services
    _open_protocol: usize,
    _close_protocol: usize,
    _open_protocol_information: usize,
    // Library Services
    _protocols_per_handle: usize,
    _locate_handle_buffer: usize,
    pub locate_protocol: extern "efiapi" fn(
        protocol: *const Guid,
        registration: *const c_void,
        interface: *mut *mut c_void,
    ) -> usize,
}

pub const EFI_SUCCESS: usize = 0;
pub const EFI_ERROR_BIT: usize = 1usize << (usize::BITS - 1);
pub const EFI_INVALID_PARAMETER: usize = EFI_ERROR_BIT | 2;
pub const EFI_BUFFER_TOO_SMALL: usize = EFI_ERROR_BIT | 5;

/// Halt forever. Used when boot fails or the kernel returns.
fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(target_os = "uefi")]
#[no_mangle]
pub extern "efiapi" fn efi_main(image_handle: *mut c_void, system_table: *const SystemTable) -> usize {
    use lodestar_core::{boot_firmware, logger, LoaderConfig, NativeInvoker, BOOT_FAILED};

    // SAFETY: firmware passes a valid system table with live boot services
    let st = unsafe { &*system_table };
    let bs = unsafe { &*st.boot_services };

    console::attach(st.con_out);
    // SAFETY: boot services are live and nothing has allocated from the heap yet
    if unsafe { heap::init(bs) }.is_err() {
        console::write_line("lodestar: heap reservation failed");
        halt();
    }

    logger::init(log::LevelFilter::Info);
    logger::set_sink(console::write_line);

    (bs.set_watchdog_timer)(0, 0, 0, core::ptr::null());

    let config = LoaderConfig::default();
    let mut env = firmware::FirmwareEnvironment::new(image_handle, st);
    let mut provisioner = provision::PageProvisioner::new(bs);
    let mut invoker = NativeInvoker;

    let result = boot_firmware(&mut env, &mut provisioner, &mut invoker, &config);
    if result == BOOT_FAILED {
        log::error!("boot failed, halting");
    }
    halt()
}

#[cfg(target_os = "uefi")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("panic: {}", info);
    halt()
}

#[cfg(not(target_os = "uefi"))]
fn main() {
    eprintln!("lodestar-bootloader runs as a UEFI application; build it for x86_64-unknown-uefi");
}
