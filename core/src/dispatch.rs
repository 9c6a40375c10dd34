//! Entry dispatch.
//!
//! Three call shapes, each with its calling convention fixed:
//! 1. `Scratch`: hosted path, `extern "sysv64" fn(*mut i32) -> i32`
//! 2. `SysV64Handoff`: ELF kernel on firmware, `extern "sysv64" fn(*mut HandoffContext) -> i32`
//! 3. `Win64Handoff`: flat kernel on firmware, `extern "win64" fn(*mut HandoffContext) -> i32`

use core::ffi::c_void;

use crate::error::{Result, UnsupportedReason};
use crate::image::ImageFormat;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryAbi {
    Scratch { entry: u64 },
    SysV64Handoff { entry: u64 },
    Win64Handoff { entry: u64 },
}

impl EntryAbi {
    /// Call shape for the hosted path. Only ELF images have one.
    pub fn hosted(format: ImageFormat, entry: u64) -> Result<Self> {
        match format {
            ImageFormat::Elf64 => Ok(EntryAbi::Scratch { entry }),
            ImageFormat::FlatX86_64 => Err(UnsupportedReason::NotBootableHere.into()),
            other => other.bootable().map(|_| EntryAbi::Scratch { entry }),
        }
    }

    /// Call shape for the firmware path.
    pub fn firmware(format: ImageFormat, entry: u64) -> Result<Self> {
        match format {
            ImageFormat::Elf64 => Ok(EntryAbi::SysV64Handoff { entry }),
            ImageFormat::FlatX86_64 => Ok(EntryAbi::Win64Handoff { entry }),
            other => other.bootable().map(|_| EntryAbi::SysV64Handoff { entry }),
        }
    }

    pub fn entry(&self) -> u64 {
        match *self {
            EntryAbi::Scratch { entry }
            | EntryAbi::SysV64Handoff { entry }
            | EntryAbi::Win64Handoff { entry } => entry,
        }
    }
}

/// Performs the jump into a loaded image.
pub trait EntryInvoker {
    /// Call the entry point with `argument` and return its result.
    ///
    /// # Safety
    /// The entry address must point at code loaded for `abi`, and
    /// `argument` must be what that code expects: a scratch `i32` for
    /// [`EntryAbi::Scratch`], a [`HandoffContext`](crate::handoff::HandoffContext)
    /// otherwise.
    unsafe fn invoke(&mut self, abi: EntryAbi, argument: *mut c_void) -> Result<i32>;
}

/// Calls the entry point for real.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeInvoker;

impl EntryInvoker for NativeInvoker {
    #[cfg(target_arch = "x86_64")]
    unsafe fn invoke(&mut self, abi: EntryAbi, argument: *mut c_void) -> Result<i32> {
        type ScratchFn = extern "sysv64" fn(*mut i32) -> i32;
        type SysV64Fn = extern "sysv64" fn(*mut c_void) -> i32;
        type Win64Fn = extern "win64" fn(*mut c_void) -> i32;

        let address = abi.entry() as usize as *const ();
        let result = match abi {
            EntryAbi::Scratch { .. } => {
                let entry: ScratchFn = core::mem::transmute(address);
                entry(argument as *mut i32)
            }
            EntryAbi::SysV64Handoff { .. } => {
                let entry: SysV64Fn = core::mem::transmute(address);
                entry(argument)
            }
            EntryAbi::Win64Handoff { .. } => {
                let entry: Win64Fn = core::mem::transmute(address);
                entry(argument)
            }
        };
        Ok(result)
    }

    #[cfg(not(target_arch = "x86_64"))]
    unsafe fn invoke(&mut self, _abi: EntryAbi, _argument: *mut c_void) -> Result<i32> {
        Err(crate::error::BootError::UnsupportedArchitecture)
    }
}
