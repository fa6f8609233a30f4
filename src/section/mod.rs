// Wed Jan 21 2026 - Alex

pub mod header;
pub mod image;
pub mod import;
pub mod reloc;

pub use header::{DirectoryPatch, HeaderPatcher, DIRECTORY_BASERELOC, DIRECTORY_IMPORT};
pub use image::{ImageAssembler, RebuiltImage};
pub use import::{ImportSectionBuilder, DESCRIPTOR_SIZE, FORWARDER_CHAIN_NONE};
pub use reloc::{RelocationSectionBuilder, BLOCK_HEADER_SIZE};

use crate::utils::align_up;
use thiserror::Error;

/// Every rebuilt section is padded to this size.
pub const SECTION_ALIGNMENT: usize = 0x1000;

#[derive(Error, Debug)]
pub enum SectionError {
    #[error("Failed to allocate {0} bytes for a section buffer")]
    Allocation(usize),
    #[error("Section size overflows the address space")]
    SizeOverflow,
    #[error("{what} {value:#x} does not fit in a 32-bit field")]
    FieldOverflow { what: &'static str, value: u64 },
    #[error("Write of {len} bytes at {offset:#x} falls outside the section")]
    OutOfBounds { offset: usize, len: usize },
    #[error("Failed to parse image headers: {0}")]
    HeaderParse(String),
    #[error("Image has no optional header")]
    MissingOptionalHeader,
    #[error("Unsupported optional header magic {0:#x}")]
    UnsupportedMagic(u16),
    #[error("Optional header has {0} data directories, need at least 6")]
    TooFewDirectories(u32),
}

/// A rebuilt section's bytes, zero padded to `SECTION_ALIGNMENT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    data: Vec<u8>,
}

impl Section {
    /// Allocates a zeroed, aligned buffer able to hold `content_size` bytes.
    pub(crate) fn zeroed(content_size: usize) -> Result<Self, SectionError> {
        let size = align_up(content_size, SECTION_ALIGNMENT).ok_or(SectionError::SizeOverflow)?;

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| SectionError::Allocation(size))?;
        data.resize(size, 0);

        Ok(Self { data })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub(crate) fn to_u32(what: &'static str, value: u64) -> Result<u32, SectionError> {
    u32::try_from(value).map_err(|_| SectionError::FieldOverflow { what, value })
}

pub(crate) fn check_write(written: bool, offset: usize, len: usize) -> Result<(), SectionError> {
    if written {
        Ok(())
    } else {
        Err(SectionError::OutOfBounds { offset, len })
    }
}
