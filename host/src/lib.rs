//! Hosted runner for Lodestar images.
//!
//! Loads an ELF64 image into the current process with anonymous mappings and
//! calls its entry point with a scratch pointer.

pub mod cli;
pub mod error;
pub mod mmap;
pub mod sink;

use std::path::Path;

use lodestar_core::{run_hosted, LoaderConfig, NativeInvoker};

pub use error::HostError;
pub use mmap::HostProvisioner;

/// Read `path` and run it. Returns the image's result, or
/// [`BOOT_FAILED`](lodestar_core::BOOT_FAILED) if it never ran.
pub fn run_file(path: &Path, config: &LoaderConfig) -> Result<i32, HostError> {
    let image = std::fs::read(path).map_err(|source| HostError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("{}: {} bytes", path.display(), image.len());

    let mut provisioner = HostProvisioner::new(config.granularity);
    let mut invoker = NativeInvoker;
    Ok(run_hosted(&image, &mut provisioner, &mut invoker, config))
}
