// Mon Jan 19 2026 - Alex

use crate::memory::Address;
use std::fmt;

/// The span a module occupies once mapped: `[start, start + size]`.
///
/// The upper bound is inclusive. A pointer one-past-the-end of an image (for
/// example the end marker of a table placed last in the image) is still
/// considered to target that image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRange {
    start: Address,
    size: u64,
}

impl MemoryRange {
    pub fn new(start: Address, size: u64) -> Option<Self> {
        start.as_u64().checked_add(size)?;
        Some(Self { start, size })
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        Address::new(self.start.as_u64() + self.size)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr <= self.end()
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end())
    }
}
