//! Lodestar Core Library
//!
//! Format detection, ELF64 segment loading and kernel handoff, shared by
//! the UEFI bootloader and the hosted runner.
//! Designed to be no_std compatible; platform access goes through the
//! `MemoryProvisioner`, `BootEnvironment` and `EntryInvoker` traits.

#![no_std]
#![allow(clippy::new_without_default)]
#![allow(clippy::len_without_is_empty)]

extern crate alloc;

pub mod boot;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod font;
pub mod handoff;
pub mod image;
pub mod logger;
pub mod memory;
pub mod segment;

pub use boot::{boot_firmware, load_image, run_hosted, LoadedImage};
pub use config::LoaderConfig;
pub use dispatch::{EntryAbi, EntryInvoker, NativeInvoker};
pub use error::{BootError, Result, BOOT_FAILED};
pub use image::{detect, ImageFormat};
