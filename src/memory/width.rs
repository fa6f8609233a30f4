// Mon Jan 19 2026 - Alex

use crate::utils::BinaryUtils;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a pointer in the dumped process. Governs every pointer read and
/// write, the thunk size of a rebuilt import directory and the base
/// relocation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PointerWidth {
    Bits32,
    #[default]
    Bits64,
}

/// IMAGE_REL_BASED_HIGHLOW
pub const REL_BASED_HIGHLOW: u16 = 3;
/// IMAGE_REL_BASED_DIR64
pub const REL_BASED_DIR64: u16 = 10;

impl PointerWidth {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Self::Bits32),
            64 => Some(Self::Bits64),
            _ => None,
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            Self::Bits32 => 4,
            Self::Bits64 => 8,
        }
    }

    pub fn relocation_type(&self) -> u16 {
        match self {
            Self::Bits32 => REL_BASED_HIGHLOW,
            Self::Bits64 => REL_BASED_DIR64,
        }
    }

    /// Reads an unsigned pointer-sized little-endian value.
    pub fn read(&self, data: &[u8], offset: usize) -> Option<u64> {
        match self {
            Self::Bits32 => BinaryUtils::read_u32_le(data, offset).map(u64::from),
            Self::Bits64 => BinaryUtils::read_u64_le(data, offset),
        }
    }

    /// Reads a pointer-sized value as a sign-extended displacement.
    pub fn read_signed(&self, data: &[u8], offset: usize) -> Option<i64> {
        match self {
            Self::Bits32 => BinaryUtils::read_i32_le(data, offset).map(i64::from),
            Self::Bits64 => BinaryUtils::read_i64_le(data, offset),
        }
    }

    /// Drops any bits above the pointer width, matching address arithmetic in
    /// the dumped process.
    pub fn truncate(&self, value: u64) -> u64 {
        match self {
            Self::Bits32 => value & 0xFFFF_FFFF,
            Self::Bits64 => value,
        }
    }

    /// Writes the low `bytes()` bytes of `value`. Returns `false` if the write
    /// would run past the end of `data`.
    pub fn write(&self, data: &mut [u8], offset: usize, value: u64) -> bool {
        match self {
            Self::Bits32 => BinaryUtils::write_u32_le(data, offset, value as u32),
            Self::Bits64 => BinaryUtils::write_u64_le(data, offset, value),
        }
    }
}

impl TryFrom<u32> for PointerWidth {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::from_bits(bits).ok_or_else(|| format!("unsupported pointer width: {} bits", bits))
    }
}

impl From<PointerWidth> for u32 {
    fn from(width: PointerWidth) -> Self {
        width.bits()
    }
}

impl fmt::Display for PointerWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_32() {
        let mut buf = [0u8; 8];
        assert!(PointerWidth::Bits32.write(&mut buf, 2, 0x1_2345_6789));
        assert_eq!(PointerWidth::Bits32.read(&buf, 2), Some(0x2345_6789));
        assert!(!PointerWidth::Bits32.write(&mut buf, 5, 1));
    }

    #[test]
    fn test_signed_read_sign_extends() {
        let buf = 0xFFFF_FFF0u32.to_le_bytes();
        assert_eq!(PointerWidth::Bits32.read_signed(&buf, 0), Some(-16));
        assert_eq!(PointerWidth::Bits64.read_signed(&buf, 0), None);
    }

    #[test]
    fn test_serde_as_bits() {
        let json = serde_json::to_string(&PointerWidth::Bits32).unwrap();
        assert_eq!(json, "32");
        let width: PointerWidth = serde_json::from_str("64").unwrap();
        assert_eq!(width, PointerWidth::Bits64);
        assert!(serde_json::from_str::<PointerWidth>("16").is_err());
    }
}
