//! Bookkeeping of ranges a provisioner has already granted.
//!
//! LOAD segments may share a page with the segment before them. Provisioners
//! record every grant here and only ask the platform for the pieces of a new
//! request that are not yet backed.

use alloc::vec;
use alloc::vec::Vec;

use super::AddressRange;

#[derive(Debug, Default, Clone)]
pub struct ProvisionLedger {
    granted: Vec<AddressRange>,
}

impl ProvisionLedger {
    pub const fn new() -> Self {
        Self {
            granted: Vec::new(),
        }
    }

    /// Pieces of `request` not covered by any earlier grant, in address order.
    pub fn uncovered(&self, request: AddressRange) -> Vec<AddressRange> {
        if request.is_empty() {
            return Vec::new();
        }

        let mut pieces = vec![request];
        for granted in &self.granted {
            let mut next = Vec::with_capacity(pieces.len() + 1);
            for piece in pieces {
                let (below, above) = piece.subtract(granted);
                next.extend(below);
                next.extend(above);
            }
            pieces = next;
        }

        pieces.sort();
        pieces
    }

    pub fn is_covered(&self, request: AddressRange) -> bool {
        self.uncovered(request).is_empty()
    }

    pub fn record(&mut self, range: AddressRange) {
        if !range.is_empty() {
            self.granted.push(range);
        }
    }

    pub fn granted(&self) -> &[AddressRange] {
        &self.granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, len: u64) -> AddressRange {
        AddressRange::new(start, len).unwrap()
    }

    #[test]
    fn fresh_ledger_covers_nothing() {
        let ledger = ProvisionLedger::new();
        assert_eq!(ledger.uncovered(range(0x1000, 0x2000)), vec![range(0x1000, 0x2000)]);
    }

    #[test]
    fn shared_page_is_not_requested_twice() {
        let mut ledger = ProvisionLedger::new();
        ledger.record(range(0x40_0000, 0x1000));

        let pieces = ledger.uncovered(range(0x40_0000, 0x3000));
        assert_eq!(pieces, vec![range(0x40_1000, 0x2000)]);
        assert!(ledger.is_covered(range(0x40_0800, 0x100)));
    }

    #[test]
    fn request_with_hole_in_the_middle() {
        let mut ledger = ProvisionLedger::new();
        ledger.record(range(0x2000, 0x1000));

        let pieces = ledger.uncovered(range(0x1000, 0x3000));
        assert_eq!(pieces, vec![range(0x1000, 0x1000), range(0x3000, 0x1000)]);
    }

    #[test]
    fn empty_ranges_are_ignored() {
        let mut ledger = ProvisionLedger::new();
        ledger.record(AddressRange::empty(0x5000));
        assert!(ledger.granted().is_empty());
        assert!(ledger.is_covered(AddressRange::empty(0x5000)));
    }
}
