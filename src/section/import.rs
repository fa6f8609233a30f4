// Wed Jan 21 2026 - Alex

use crate::diff::{ImportRun, RebuildData};
use crate::section::{check_write, to_u32, Section, SectionError};
use crate::utils::BinaryUtils;

/// IMAGE_IMPORT_DESCRIPTOR
pub const DESCRIPTOR_SIZE: usize = 20;
pub const FORWARDER_CHAIN_NONE: u32 = 0xFFFF_FFFF;
const HINT_SIZE: usize = 2;

/// Byte sizes of the four regions of the section, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ImportLayout {
    descriptors: usize,
    module_names: usize,
    thunks: usize,
    hint_names: usize,
}

impl ImportLayout {
    fn compute(runs: &[ImportRun], thunk_size: usize) -> Self {
        let mut layout = Self {
            descriptors: (runs.len() + 1) * DESCRIPTOR_SIZE,
            module_names: 0,
            thunks: 0,
            hint_names: 0,
        };

        for run in runs {
            layout.module_names += run.module_name().len() + 1;
            layout.thunks += (run.len() + 1) * thunk_size;
            layout.hint_names += run
                .entries()
                .iter()
                .map(|e| HINT_SIZE + e.import.export_name.len() + 1)
                .sum::<usize>();
        }

        layout
    }

    fn names_start(&self) -> usize {
        self.descriptors
    }

    fn thunks_start(&self) -> usize {
        self.descriptors + self.module_names
    }

    fn hint_names_start(&self) -> usize {
        self.thunks_start() + self.thunks
    }

    fn total(&self) -> usize {
        self.hint_names_start() + self.hint_names
    }
}

/// Encodes import runs as an import directory.
///
/// Layout: one descriptor per run plus a zeroed terminator, the module name
/// strings, the original-first-thunk arrays (one null-terminated array per
/// run), then the hint/name entries. Every address written is an RVA computed
/// from `section_base`, the RVA the section will be placed at. FirstThunk of
/// each descriptor is the run's own start offset in the image.
pub struct ImportSectionBuilder<'a> {
    data: &'a RebuildData,
    section_base: u64,
}

impl<'a> ImportSectionBuilder<'a> {
    pub fn new(data: &'a RebuildData, section_base: u64) -> Self {
        Self { data, section_base }
    }

    pub fn descriptor_count(&self) -> usize {
        self.data.import_runs().len()
    }

    /// Size of the directory before padding, `None` if there are no runs.
    pub fn content_size(&self) -> Option<usize> {
        let runs = self.data.import_runs();
        if runs.is_empty() {
            return None;
        }
        Some(ImportLayout::compute(runs, self.data.pointer_width().bytes()).total())
    }

    /// Returns `Ok(None)` when there is nothing to import.
    pub fn build(&self) -> Result<Option<Section>, SectionError> {
        let runs = self.data.import_runs();
        if runs.is_empty() {
            log::info!("No import runs, skipping import directory");
            return Ok(None);
        }

        log::info!("Creating import directory...");

        let width = self.data.pointer_width();
        let thunk_size = width.bytes();
        let layout = ImportLayout::compute(runs, thunk_size);
        let mut section = Section::zeroed(layout.total())?;
        let buf = section.data_mut();

        let rva = |offset: usize| -> Result<u32, SectionError> {
            to_u32("import RVA", self.section_base.saturating_add(offset as u64))
        };

        let mut descriptor = 0;
        let mut name = layout.names_start();
        let mut thunk = layout.thunks_start();
        let mut hint_name = layout.hint_names_start();

        for run in runs {
            let first_thunk = to_u32("first thunk", run.start_offset())?;
            let fields = [rva(thunk)?, 0, FORWARDER_CHAIN_NONE, rva(name)?, first_thunk];
            for (i, value) in fields.into_iter().enumerate() {
                let at = descriptor + i * 4;
                check_write(BinaryUtils::write_u32_le(buf, at, value), at, 4)?;
            }
            descriptor += DESCRIPTOR_SIZE;

            let module = run.module_name();
            name += BinaryUtils::write_c_string(buf, name, module)
                .ok_or(SectionError::OutOfBounds { offset: name, len: module.len() + 1 })?;

            for entry in run.entries() {
                let target = u64::from(rva(hint_name)?);
                check_write(width.write(buf, thunk, target), thunk, thunk_size)?;
                thunk += thunk_size;

                // Hint stays zero.
                let export = &entry.import.export_name;
                hint_name += HINT_SIZE;
                hint_name += BinaryUtils::write_c_string(buf, hint_name, export)
                    .ok_or(SectionError::OutOfBounds { offset: hint_name, len: export.len() + 1 })?;
            }

            // Null thunk terminates the run.
            thunk += thunk_size;

            log::debug!(
                "Descriptor for {}: {} thunks, FirstThunk {:#x}",
                module,
                run.len(),
                first_thunk
            );
        }

        log::debug!(
            "ImportDir: {:#x}, size: {:#x}, OFT: {:#x}",
            self.section_base,
            layout.descriptors,
            self.section_base + layout.thunks_start() as u64
        );

        Ok(Some(section))
    }
}
