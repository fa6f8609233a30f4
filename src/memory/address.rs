// Mon Jan 19 2026 - Alex

use std::fmt;

/// An absolute address in some dumped process's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address {
    value: u64,
}

impl Address {
    pub const fn new(value: u64) -> Self {
        Self { value }
    }

    pub const fn as_u64(&self) -> u64 {
        self.value
    }

    /// Adds a signed displacement, wrapping at the top of the address space the
    /// way a CPU computes a branch target.
    pub fn wrapping_offset(&self, displacement: i64) -> Self {
        Self { value: self.value.wrapping_add_signed(displacement) }
    }

    pub fn wrapping_add(&self, rhs: u64) -> Self {
        Self { value: self.value.wrapping_add(rhs) }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_offset() {
        let a = Address::new(0x1000);
        assert_eq!(a.wrapping_offset(-0x10), Address::new(0xff0));
        assert_eq!(a.wrapping_offset(0x10), Address::new(0x1010));
        assert_eq!(Address::new(0).wrapping_offset(-1), Address::new(u64::MAX));
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::new(0x7ff6a0000000).to_string(), "0x7ff6a0000000");
    }
}
