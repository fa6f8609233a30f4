// Wed Jan 21 2026 - Alex

use crate::diff::RebuildData;
use crate::section::{check_write, to_u32, Section, SectionError};
use crate::utils::BinaryUtils;

/// IMAGE_BASE_RELOCATION: VirtualAddress, SizeOfBlock
pub const BLOCK_HEADER_SIZE: usize = 8;
const ENTRY_SIZE: usize = 2;

/// Encodes page-grouped relocations as a base relocation table.
///
/// One block per page in ascending page order, each a header followed by one
/// 16-bit entry per relocation (type in the top nibble, page offset in the low
/// 12 bits), then an all-zero terminator block.
pub struct RelocationSectionBuilder<'a> {
    data: &'a RebuildData,
}

impl<'a> RelocationSectionBuilder<'a> {
    pub fn new(data: &'a RebuildData) -> Self {
        Self { data }
    }

    pub fn block_count(&self) -> usize {
        self.data.relocation_pages().len()
    }

    /// Size of the table before padding.
    pub fn content_size(&self) -> usize {
        (self.block_count() + 1) * BLOCK_HEADER_SIZE + self.data.relocation_count() * ENTRY_SIZE
    }

    pub fn build(&self) -> Result<Section, SectionError> {
        log::info!("Creating relocation section...");

        let mut section = Section::zeroed(self.content_size())?;
        let reloc_type = self.data.pointer_width().relocation_type();
        let buf = section.data_mut();
        let mut cursor = 0;

        for (&page, offsets) in self.data.relocation_pages() {
            let block_size = BLOCK_HEADER_SIZE + offsets.len() * ENTRY_SIZE;

            check_write(BinaryUtils::write_u32_le(buf, cursor, to_u32("page address", page)?), cursor, 4)?;
            check_write(
                BinaryUtils::write_u32_le(buf, cursor + 4, to_u32("block size", block_size as u64)?),
                cursor + 4,
                4,
            )?;

            let mut entry = cursor + BLOCK_HEADER_SIZE;
            for &offset in offsets {
                let value = (reloc_type << 12) | (offset & 0x0FFF);
                check_write(BinaryUtils::write_u16_le(buf, entry, value), entry, ENTRY_SIZE)?;
                entry += ENTRY_SIZE;
            }

            log::debug!("Block {:#x}: {} entries", page, offsets.len());
            cursor += block_size;
        }

        // Terminator block is already zero.
        log::debug!(
            "Relocation table is {:#x} bytes, section {:#x}",
            cursor + BLOCK_HEADER_SIZE,
            section.len()
        );

        Ok(section)
    }
}
