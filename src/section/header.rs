// Wed Jan 21 2026 - Alex

use crate::section::{check_write, SectionError};
use crate::utils::BinaryUtils;
use goblin::pe::header::Header;
use goblin::pe::optional_header::{MAGIC_32, MAGIC_64};

pub const DIRECTORY_IMPORT: usize = 1;
pub const DIRECTORY_BASERELOC: usize = 5;

const SIGNATURE_AND_COFF_SIZE: usize = 4 + 20;
const SIZE_OF_IMAGE_OFFSET: usize = 56;
const DATA_DIRECTORIES_32: usize = 96;
const DATA_DIRECTORIES_64: usize = 112;
const DATA_DIRECTORY_SIZE: usize = 8;

/// New values for the header fields that describe the rebuilt sections.
/// Each directory is `(rva, size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryPatch {
    pub relocation: (u32, u32),
    pub import: Option<(u32, u32)>,
    pub size_of_image: u32,
}

/// Points a dumped image's data directories at the rebuilt sections.
///
/// Only the BASERELOC and IMPORT directories and SizeOfImage are written; the
/// rest of the header is left exactly as dumped.
pub struct HeaderPatcher {
    optional_header: usize,
    directories: usize,
}

impl HeaderPatcher {
    /// Parses the image's headers. Fails if the dump no longer carries a
    /// usable PE header.
    pub fn parse(image: &[u8]) -> Result<Self, SectionError> {
        let header = Header::parse(image).map_err(|e| SectionError::HeaderParse(e.to_string()))?;
        let optional = header
            .optional_header
            .ok_or(SectionError::MissingOptionalHeader)?;

        let directory_count = optional.windows_fields.number_of_rva_and_sizes;
        if directory_count <= DIRECTORY_BASERELOC as u32 {
            return Err(SectionError::TooFewDirectories(directory_count));
        }

        let directories = match optional.standard_fields.magic {
            MAGIC_32 => DATA_DIRECTORIES_32,
            MAGIC_64 => DATA_DIRECTORIES_64,
            other => return Err(SectionError::UnsupportedMagic(other)),
        };

        Ok(Self {
            optional_header: header.dos_header.pe_pointer as usize + SIGNATURE_AND_COFF_SIZE,
            directories,
        })
    }

    pub fn apply(&self, image: &mut [u8], patch: &DirectoryPatch) -> Result<(), SectionError> {
        self.write_directory(image, DIRECTORY_BASERELOC, patch.relocation)?;
        if let Some(import) = patch.import {
            self.write_directory(image, DIRECTORY_IMPORT, import)?;
        }

        let at = self.optional_header + SIZE_OF_IMAGE_OFFSET;
        check_write(BinaryUtils::write_u32_le(image, at, patch.size_of_image), at, 4)?;

        log::debug!(
            "Patched headers: reloc {:#x?}, import {:#x?}, SizeOfImage {:#x}",
            patch.relocation,
            patch.import,
            patch.size_of_image
        );
        Ok(())
    }

    fn write_directory(&self, image: &mut [u8], index: usize, (rva, size): (u32, u32)) -> Result<(), SectionError> {
        let at = self.optional_header + self.directories + index * DATA_DIRECTORY_SIZE;
        check_write(BinaryUtils::write_u32_le(image, at, rva), at, 4)?;
        check_write(BinaryUtils::write_u32_le(image, at + 4, size), at + 4, 4)
    }
}
