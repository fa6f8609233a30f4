// Wed Jan 21 2026 - Alex

use crate::diff::RebuildData;
use crate::section::{
    to_u32, DirectoryPatch, HeaderPatcher, ImportSectionBuilder, RelocationSectionBuilder, SectionError,
    BLOCK_HEADER_SIZE, DESCRIPTOR_SIZE,
};
use std::ops::Range;

/// The reference dump with the rebuilt sections appended.
#[derive(Debug, Clone)]
pub struct RebuiltImage {
    bytes: Vec<u8>,
    relocation_range: Range<usize>,
    import_range: Option<Range<usize>>,
    headers_patched: bool,
}

impl RebuiltImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn relocation_range(&self) -> &Range<usize> {
        &self.relocation_range
    }

    /// `None` when no absolute imports were found.
    pub fn import_range(&self) -> Option<&Range<usize>> {
        self.import_range.as_ref()
    }

    pub fn headers_patched(&self) -> bool {
        self.headers_patched
    }
}

/// Lays out `image | .reloc | imports` and optionally points the image's
/// data directories at the new sections.
pub struct ImageAssembler<'a> {
    image: &'a [u8],
    data: &'a RebuildData,
    patch_headers: bool,
}

impl<'a> ImageAssembler<'a> {
    pub fn new(image: &'a [u8], data: &'a RebuildData) -> Self {
        Self {
            image,
            data,
            patch_headers: true,
        }
    }

    pub fn with_header_patch(mut self, enabled: bool) -> Self {
        self.patch_headers = enabled;
        self
    }

    pub fn assemble(&self) -> Result<RebuiltImage, SectionError> {
        let relocs = RelocationSectionBuilder::new(self.data);
        let reloc_section = relocs.build()?;

        let reloc_start = self.image.len();
        let reloc_end = reloc_start
            .checked_add(reloc_section.len())
            .ok_or(SectionError::SizeOverflow)?;

        let imports = ImportSectionBuilder::new(self.data, reloc_end as u64);
        let import_section = imports.build()?;
        let import_end = reloc_end
            .checked_add(import_section.as_ref().map_or(0, |s| s.len()))
            .ok_or(SectionError::SizeOverflow)?;

        log::info!("Creating reloc section at {:#x} - {:#x}", reloc_start, reloc_end);
        if import_section.is_some() {
            log::info!("Creating import section at {:#x} - {:#x}", reloc_end, import_end);
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(import_end)
            .map_err(|_| SectionError::Allocation(import_end))?;
        bytes.extend_from_slice(self.image);
        bytes.extend_from_slice(reloc_section.data());
        if let Some(section) = &import_section {
            bytes.extend_from_slice(section.data());
        }

        let import_range = import_section.as_ref().map(|_| reloc_end..import_end);

        let mut headers_patched = false;
        if self.patch_headers {
            let patch = DirectoryPatch {
                relocation: (
                    to_u32("relocation directory", reloc_start as u64)?,
                    to_u32("relocation directory size", (relocs.content_size() - BLOCK_HEADER_SIZE) as u64)?,
                ),
                import: match &import_range {
                    Some(range) => Some((
                        to_u32("import directory", range.start as u64)?,
                        to_u32(
                            "import directory size",
                            ((imports.descriptor_count() + 1) * DESCRIPTOR_SIZE) as u64,
                        )?,
                    )),
                    None => None,
                },
                size_of_image: to_u32("image size", import_end as u64)?,
            };

            match HeaderPatcher::parse(self.image) {
                Ok(patcher) => {
                    patcher.apply(&mut bytes, &patch)?;
                    headers_patched = true;
                }
                Err(e) => log::warn!("Leaving headers untouched, they might still be invalid: {}", e),
            }
        }

        Ok(RebuiltImage {
            bytes,
            relocation_range: reloc_start..reloc_end,
            import_range,
            headers_patched,
        })
    }
}
