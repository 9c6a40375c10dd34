//! Segment loader.
//!
//! Loading runs in two passes:
//! 1. Plan: every LOAD entry is validated and turned into a [`LoadPlan`].
//!    A malformed image fails here, before any memory is requested.
//! 2. Load: in table order, one provisioning call per plan, then copy the
//!    file bytes and zero the rest of the segment.
//!
//! A failure in pass 2 aborts the load. Segments already placed stay where
//! they are.

use alloc::vec::Vec;

use crate::error::{BootError, InvalidImageReason, Result};
use crate::image::{ElfImage, ProgramHeader, SegmentFlags};
use crate::memory::{AddressRange, MemoryProvisioner, ProvisionRequest};

/// Where one LOAD entry goes and what backs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPlan {
    /// Position in the program-header table
    pub index: usize,
    /// `[vaddr, vaddr + memsz)`
    pub destination: AddressRange,
    /// Range requested from the provisioner: `destination` with its start
    /// rounded down to the granularity
    pub provisioned: AddressRange,
    pub source_offset: usize,
    pub source_len: usize,
    pub alignment: u64,
    pub flags: SegmentFlags,
}

impl LoadPlan {
    /// Validate one LOAD entry against an image of `image_len` bytes.
    pub fn for_segment(
        index: usize,
        ph: &ProgramHeader,
        image_len: usize,
        granularity: u64,
    ) -> Result<Self> {
        if ph.memsz < ph.filesz {
            return Err(InvalidImageReason::MemorySmallerThanFile.into());
        }

        let source_end = ph
            .offset
            .checked_add(ph.filesz)
            .ok_or(InvalidImageReason::SegmentOutOfBounds)?;
        if source_end > image_len as u64 {
            return Err(InvalidImageReason::SegmentOutOfBounds.into());
        }

        let destination =
            AddressRange::new(ph.vaddr, ph.memsz).ok_or(InvalidImageReason::AddressOverflow)?;
        // memsz must fit a slice on this target
        usize::try_from(ph.memsz).map_err(|_| InvalidImageReason::AddressOverflow)?;

        Ok(Self {
            index,
            destination,
            provisioned: destination.align_start_down(granularity),
            source_offset: ph.offset as usize,
            source_len: ph.filesz as usize,
            alignment: ph.align,
            flags: ph.flags,
        })
    }

    /// Bytes to copy into the start of the destination.
    pub fn source<'a>(&self, image: &'a [u8]) -> &'a [u8] {
        &image[self.source_offset..self.source_offset + self.source_len]
    }

    /// Bytes at the end of the destination that are zero-filled.
    pub fn zero_len(&self) -> u64 {
        self.destination.len() - self.source_len as u64
    }
}

/// What [`load_segments`] placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of LOAD entries placed
    pub segments: usize,
    /// Lowest to highest destination address over all non-empty segments
    pub span: Option<AddressRange>,
}

/// First pass: validate every LOAD entry, in table order.
pub fn plan_segments(elf: &ElfImage<'_>, granularity: u64) -> Result<Vec<LoadPlan>> {
    let granularity = granularity.max(1);
    let image_len = elf.bytes().len();

    elf.load_segments()
        .map(|(index, ph)| LoadPlan::for_segment(index, &ph, image_len, granularity))
        .collect()
}

/// Second pass: place every planned segment.
pub fn load_segments<P>(elf: &ElfImage<'_>, provisioner: &mut P) -> Result<LoadReport>
where
    P: MemoryProvisioner + ?Sized,
{
    let plans = plan_segments(elf, provisioner.granularity())?;
    let mut span: Option<AddressRange> = None;

    for plan in &plans {
        place(elf.bytes(), plan, provisioner)?;

        log::debug!(
            "segment {}: {:#x}..{:#x} {:?} file={:#x} zero={:#x}",
            plan.index,
            plan.destination.start(),
            plan.destination.end(),
            plan.flags,
            plan.source_len,
            plan.zero_len()
        );

        if !plan.destination.is_empty() {
            span = Some(match span {
                None => plan.destination,
                Some(seen) => AddressRange::from_bounds(
                    seen.start().min(plan.destination.start()),
                    seen.end().max(plan.destination.end()),
                )
                .unwrap_or(seen),
            });
        }
    }

    Ok(LoadReport {
        segments: plans.len(),
        span,
    })
}

fn place<P>(image: &[u8], plan: &LoadPlan, provisioner: &mut P) -> Result<()>
where
    P: MemoryProvisioner + ?Sized,
{
    let request = ProvisionRequest {
        range: plan.provisioned,
        alignment: plan.alignment,
    };

    let granted = provisioner.allocate(&request).map_err(|err| {
        log::warn!(
            "provisioner refused {:#x}..{:#x}: {}",
            plan.provisioned.start(),
            plan.provisioned.end(),
            err
        );
        BootError::AllocationFailure {
            range: plan.provisioned,
        }
    })?;

    if granted != plan.provisioned.start() {
        return Err(BootError::AddressMismatch {
            requested: plan.provisioned.start(),
            granted,
        });
    }

    // SAFETY: destination lies inside the range the provisioner just granted
    let dest = unsafe { provisioner.destination(plan.destination) };
    if dest.len() as u64 != plan.destination.len() {
        return Err(BootError::AllocationFailure {
            range: plan.provisioned,
        });
    }

    let (file, zero) = dest.split_at_mut(plan.source_len);
    file.copy_from_slice(plan.source(image));
    zero.fill(0);
    Ok(())
}
