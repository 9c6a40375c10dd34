//! Half-open address ranges and alignment arithmetic.

/// Largest multiple of `alignment` not above `value`. Any non-zero
/// alignment works, not only powers of two.
pub const fn align_down(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    value - value % alignment
}

/// Smallest multiple of `alignment` not below `value`, or `None` if that
/// overflows.
pub const fn align_up(value: u64, alignment: u64) -> Option<u64> {
    if alignment == 0 {
        return Some(value);
    }
    match value % alignment {
        0 => Some(value),
        rem => value.checked_add(alignment - rem),
    }
}

/// `[start, end)` in a 64-bit address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressRange {
    start: u64,
    end: u64,
}

impl AddressRange {
    /// Range of `len` bytes at `start`, or `None` if it wraps.
    pub const fn new(start: u64, len: u64) -> Option<Self> {
        match start.checked_add(len) {
            Some(end) => Some(Self { start, end }),
            None => None,
        }
    }

    /// Range between two bounds, or `None` if `end < start`.
    pub const fn from_bounds(start: u64, end: u64) -> Option<Self> {
        if end < start {
            None
        } else {
            Some(Self { start, end })
        }
    }

    /// Empty range anchored at `at`.
    pub const fn empty(at: u64) -> Self {
        Self { start: at, end: at }
    }

    pub const fn start(&self) -> u64 {
        self.start
    }

    pub const fn end(&self) -> u64 {
        self.end
    }

    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Whether every byte of `other` lies inside `self`.
    pub const fn covers(&self, other: &AddressRange) -> bool {
        other.is_empty() || (other.start >= self.start && other.end <= self.end)
    }

    pub const fn overlaps(&self, other: &AddressRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Move the start down to the previous `granularity` boundary, keeping
    /// the end. The result always covers `self`.
    pub const fn align_start_down(&self, granularity: u64) -> Self {
        Self {
            start: align_down(self.start, granularity),
            end: self.end,
        }
    }

    /// Smallest `granularity`-aligned range covering `self`, or `None` if the
    /// end cannot be rounded up without wrapping.
    pub const fn round_out(&self, granularity: u64) -> Option<Self> {
        match align_up(self.end, granularity) {
            Some(end) => Some(Self {
                start: align_down(self.start, granularity),
                end,
            }),
            None => None,
        }
    }

    /// Parts of `self` left after removing `other`: the piece below it and
    /// the piece above it.
    pub fn subtract(&self, other: &AddressRange) -> (Option<Self>, Option<Self>) {
        if !self.overlaps(other) {
            return (Some(*self), None);
        }
        let below = (self.start < other.start).then(|| Self {
            start: self.start,
            end: other.start,
        });
        let above = (other.end < self.end).then(|| Self {
            start: other.end,
            end: self.end,
        });
        (below, above)
    }
}
