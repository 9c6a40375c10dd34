//! Load entry points.
//!
//! Hosted:   detect -> parse -> load -> invoke(scratch)
//! Firmware: read kernel -> read font -> detect -> parse -> load
//!           -> memory map -> relinquish -> invoke(context)
//!
//! Both return the image's own result, or [`BOOT_FAILED`] when any step
//! before the jump failed. Errors are logged before the sentinel is
//! returned.

use core::ffi::c_void;

use crate::config::LoaderConfig;
use crate::dispatch::{EntryAbi, EntryInvoker};
use crate::error::{Result, BOOT_FAILED};
use crate::font::{Psf1Font, MAX_FONT_FILE_SIZE};
use crate::handoff::{BootEnvironment, FontDescriptor, HandoffBuilder};
use crate::image::{self, ElfImage, FlatImage, ImageFormat};
use crate::memory::MemoryProvisioner;
use crate::segment;

/// Outcome of a successful [`load_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedImage {
    pub format: ImageFormat,
    pub entry: u64,
    /// LOAD segments placed; zero for flat images
    pub segments: usize,
}

/// Classify, parse and place an image. Does not jump.
///
/// Flat images run in place, so nothing is provisioned for them and their
/// entry address points into `image`.
pub fn load_image<P>(image: &[u8], provisioner: &mut P) -> Result<LoadedImage>
where
    P: MemoryProvisioner + ?Sized,
{
    let format = image::detect(image).bootable()?;

    match format {
        ImageFormat::FlatX86_64 => {
            let flat = FlatImage::parse(image)?;
            log::info!(
                "flat x86-64 image, entry offset {:#x}",
                flat.entry_offset()
            );
            Ok(LoadedImage {
                format,
                entry: flat.entry_address(),
                segments: 0,
            })
        }
        _ => {
            let elf = ElfImage::parse(image)?;
            let report = segment::load_segments(&elf, provisioner)?;
            log::info!(
                "ELF64 image, {} LOAD segment(s), entry {:#x}",
                report.segments,
                elf.entry()
            );
            Ok(LoadedImage {
                format,
                entry: elf.entry(),
                segments: report.segments,
            })
        }
    }
}

/// Load `image` in the current process and call it with a pointer to the
/// configured scratch value.
pub fn run_hosted<P, I>(
    image: &[u8],
    provisioner: &mut P,
    invoker: &mut I,
    config: &LoaderConfig,
) -> i32
where
    P: MemoryProvisioner + ?Sized,
    I: EntryInvoker + ?Sized,
{
    match try_run_hosted(image, provisioner, invoker, config) {
        Ok(result) => result,
        Err(err) => {
            log::error!("{}", err);
            BOOT_FAILED
        }
    }
}

fn try_run_hosted<P, I>(
    image: &[u8],
    provisioner: &mut P,
    invoker: &mut I,
    config: &LoaderConfig,
) -> Result<i32>
where
    P: MemoryProvisioner + ?Sized,
    I: EntryInvoker + ?Sized,
{
    // Rejected before anything is provisioned
    EntryAbi::hosted(image::detect(image), 0)?;

    let loaded = load_image(image, provisioner)?;
    let abi = EntryAbi::hosted(loaded.format, loaded.entry)?;

    let mut scratch = config.scratch_value;
    log::debug!("calling {:#x} with scratch {}", abi.entry(), scratch);
    // SAFETY: the segments behind the entry were just placed by load_image
    let result = unsafe { invoker.invoke(abi, &mut scratch as *mut i32 as *mut c_void)? };
    log::info!("image returned {}", result);
    Ok(result)
}

/// Read the kernel from the boot volume, load it, end boot services and
/// call it with a [`HandoffContext`](crate::handoff::HandoffContext).
///
/// Returns only if the kernel returns or anything before the jump fails.
pub fn boot_firmware<E, P, I>(
    env: &mut E,
    provisioner: &mut P,
    invoker: &mut I,
    config: &LoaderConfig,
) -> i32
where
    E: BootEnvironment + ?Sized,
    P: MemoryProvisioner + ?Sized,
    I: EntryInvoker + ?Sized,
{
    match try_boot_firmware(env, provisioner, invoker, config) {
        Ok(result) => result,
        Err(err) => {
            log::error!("{}", err);
            BOOT_FAILED
        }
    }
}

fn try_boot_firmware<E, P, I>(
    env: &mut E,
    provisioner: &mut P,
    invoker: &mut I,
    config: &LoaderConfig,
) -> Result<i32>
where
    E: BootEnvironment + ?Sized,
    P: MemoryProvisioner + ?Sized,
    I: EntryInvoker + ?Sized,
{
    let kernel = env.read_file(config.kernel_path, config.max_kernel_size)?;
    log::info!("read {} ({} bytes)", config.kernel_path, kernel.len());

    let font = match config.font_path {
        Some(path) => load_font(env, path)?,
        None => FontDescriptor::none(),
    };

    let loaded = load_image(kernel, provisioner)?;
    let abi = EntryAbi::firmware(loaded.format, loaded.entry)?;

    let builder = HandoffBuilder::new(env).with_font(font);
    let graphics = builder.graphics();
    log::info!(
        "framebuffer {:#x} {}x{}",
        graphics.base,
        graphics.width,
        graphics.height
    );
    log::info!("exiting boot services, entry {:#x}", abi.entry());

    let mut context = builder.finish(env)?;

    // SAFETY: the kernel is loaded and context outlives the call
    unsafe { invoker.invoke(abi, &mut context as *mut _ as *mut c_void) }
}

/// A missing font file is not fatal, a malformed one is.
fn load_font<E>(env: &mut E, path: &str) -> Result<FontDescriptor>
where
    E: BootEnvironment + ?Sized,
{
    let bytes = match env.read_file(path, MAX_FONT_FILE_SIZE) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("no font at {}: {}", path, err);
            return Ok(FontDescriptor::none());
        }
    };

    let font = Psf1Font::parse(bytes)?;
    log::info!(
        "font {}: {} glyphs, height {}",
        path,
        font.header().glyph_count(),
        font.header().height
    );
    Ok(font.into())
}
