//! Kernel segment memory from firmware page allocation.

use lodestar_core::memory::{MemoryProvisioner, ProvisionError, ProvisionLedger, ProvisionRequest};

use crate::memory::PAGE_SIZE;
use crate::{BootServices, EFI_SUCCESS};

const EFI_ALLOCATE_ADDRESS: usize = 2;
const EFI_LOADER_DATA: usize = 2;

/// Allocates LOADER_DATA pages at the exact addresses segments ask for.
/// Firmware memory is identity mapped, so the default `destination` applies.
pub struct PageProvisioner<'a> {
    bs: &'a BootServices,
    ledger: ProvisionLedger,
}

impl<'a> PageProvisioner<'a> {
    pub fn new(bs: &'a BootServices) -> Self {
        Self {
            bs,
            ledger: ProvisionLedger::new(),
        }
    }

    fn allocate_at(&self, address: u64, pages: usize) -> Result<(), ProvisionError> {
        let mut granted = address;
        let status =
            (self.bs.allocate_pages)(EFI_ALLOCATE_ADDRESS, EFI_LOADER_DATA, pages, &mut granted);
        if status != EFI_SUCCESS {
            return Err(ProvisionError::Firmware(status));
        }
        if granted != address {
            return Err(ProvisionError::AddressUnavailable);
        }
        Ok(())
    }
}

impl MemoryProvisioner for PageProvisioner<'_> {
    fn granularity(&self) -> u64 {
        PAGE_SIZE as u64
    }

    fn allocate(&mut self, request: &ProvisionRequest) -> Result<u64, ProvisionError> {
        let pages = request
            .range
            .round_out(PAGE_SIZE as u64)
            .ok_or(ProvisionError::AddressUnavailable)?;

        // Neighbouring segments may share a page; only ask for what is new
        for piece in self.ledger.uncovered(pages) {
            let count = (piece.len() / PAGE_SIZE as u64) as usize;
            self.allocate_at(piece.start(), count)?;
            log::debug!(
                "allocated {} pages at {:#x}",
                count,
                piece.start()
            );
            self.ledger.record(piece);
        }

        Ok(request.range.start())
    }
}
