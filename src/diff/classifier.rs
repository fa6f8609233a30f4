// Tue Jan 20 2026 - Alex

use crate::diff::records::{DirectMemoryReference, Finding, ImportReference, RelocationRecord};
use crate::diff::results::ScanResults;
use crate::memory::{Address, ExportInfo, LoadedModule, PointerWidth};
use itertools::Itertools;
use thiserror::Error;

/// `call rel` opcode
pub const CALL_REL: u8 = 0xE8;
/// `jmp rel` opcode
pub const JMP_REL: u8 = 0xE9;

const PROGRESS_INTERVAL: usize = 0x10000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("At least two dumps are required, got {0}")]
    NotEnoughModules(usize),
    #[error("Stride must be at least 1")]
    InvalidStride,
}

/// Compares two or more dumps of the same module taken at different base
/// addresses and classifies every offset.
///
/// Module 0 is the reference: every emitted offset and every stored export
/// identity is taken from it. Rules are tried in order, first match wins:
///
/// 1. relocation: every dump points into itself at the same RVA and no two
///    dumps hold the same value
/// 2. absolute import: some dump differs from the reference and every dump's
///    value is the same `module!export`
/// 3. relative import: every dump has a `call`/`jmp` opcode right before the
///    offset and the displacement lands on the same `module!export`
/// 4. direct memory reference: some dump differs from the reference and every
///    dump points at the same RVA of the same other module
///
/// A classified offset consumes a whole pointer; anything else advances by
/// `stride`.
pub struct DifferentialClassifier<'a> {
    modules: &'a [LoadedModule],
    width: PointerWidth,
    stride: usize,
}

impl<'a> DifferentialClassifier<'a> {
    pub fn new(modules: &'a [LoadedModule], width: PointerWidth) -> Result<Self, ClassifyError> {
        if modules.len() < 2 {
            return Err(ClassifyError::NotEnoughModules(modules.len()));
        }

        let reference_size = modules[0].image_size();
        for module in &modules[1..] {
            if module.image_size() != reference_size {
                log::warn!(
                    "{} is {:#x} bytes but the reference dump is {:#x}; scanning the common prefix",
                    module.label(),
                    module.image_size(),
                    reference_size
                );
            }
        }

        Ok(Self {
            modules,
            width,
            stride: 1,
        })
    }

    pub fn with_stride(mut self, stride: usize) -> Result<Self, ClassifyError> {
        if stride == 0 {
            return Err(ClassifyError::InvalidStride);
        }
        self.stride = stride;
        Ok(self)
    }

    pub fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn modules(&self) -> &[LoadedModule] {
        self.modules
    }

    /// Exclusive upper bound of scanned offsets.
    pub fn scan_end(&self) -> usize {
        let size = self
            .modules
            .iter()
            .map(LoadedModule::image_size)
            .min()
            .unwrap_or(0);
        size.saturating_sub(self.width.bytes())
    }

    pub fn scan(&self) -> ScanResults {
        self.scan_with_progress(|_| {})
    }

    /// Sequential scan. `progress` receives the current offset periodically.
    pub fn scan_with_progress<F: FnMut(usize)>(&self, mut progress: F) -> ScanResults {
        let end = self.scan_end();
        log::info!("Searching in range {:#x} - {:#x}", 0, end);

        let mut results = ScanResults::new(self.width);
        results.extend(self.scan_range(0, end, &mut progress));
        results
    }

    pub(crate) fn scan_range<F: FnMut(usize)>(
        &self,
        start: usize,
        end: usize,
        progress: &mut F,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut offset = start;
        let mut next_report = start + PROGRESS_INTERVAL;

        while offset < end {
            match self.classify_at(offset) {
                Some(finding) => {
                    log::trace!("{}", finding);
                    findings.push(finding);
                    offset += self.width.bytes();
                }
                None => offset += self.stride,
            }

            if offset >= next_report {
                progress(offset.min(end));
                next_report = offset + PROGRESS_INTERVAL;
            }
        }

        progress(end);
        findings
    }

    /// Classifies a single offset without touching any state.
    pub fn classify_at(&self, offset: usize) -> Option<Finding> {
        if let Some(reloc) = self.relocation_at(offset) {
            return Some(Finding::Relocation(reloc));
        }

        let differ = self.values_differ(offset);

        if differ {
            if let Some(import) = self.absolute_import_at(offset) {
                return Some(Finding::Import(import));
            }
        }

        if let Some(import) = self.relative_import_at(offset) {
            return Some(Finding::Import(import));
        }

        if differ {
            return self.memory_reference_at(offset).map(Finding::MemoryReference);
        }

        None
    }

    fn value(&self, module: &LoadedModule, offset: usize) -> Option<Address> {
        module.read_pointer(offset, self.width).map(Address::new)
    }

    /// True when at least one dump disagrees with the reference dump.
    fn values_differ(&self, offset: usize) -> bool {
        let first = self.value(&self.modules[0], offset);
        self.modules[1..]
            .iter()
            .any(|m| self.value(m, offset) != first)
    }

    fn relocation_at(&self, offset: usize) -> Option<RelocationRecord> {
        let reference = &self.modules[0];
        let first = self.value(reference, offset)?;
        if !reference.contains_address(first) {
            return None;
        }
        let rva = reference.rva_of(first);

        for module in &self.modules[1..] {
            let value = self.value(module, offset)?;
            if !module.contains_address(value) || module.rva_of(value) != rva {
                return None;
            }
        }

        let all_distinct = self
            .modules
            .iter()
            .tuple_combinations()
            .all(|(a, b)| self.value(a, offset) != self.value(b, offset));
        if !all_distinct {
            return None;
        }

        Some(RelocationRecord {
            offset: offset as u64,
            rva,
        })
    }

    fn absolute_import_at(&self, offset: usize) -> Option<ImportReference> {
        let reference = &self.modules[0];
        let import = reference.export_for(self.value(reference, offset)?)?;

        for module in &self.modules[1..] {
            let other = module.export_for(self.value(module, offset)?)?;
            if other != import {
                return None;
            }
        }

        Some(ImportReference {
            offset: offset as u64,
            import: import.clone(),
            is_relative: false,
        })
    }

    fn relative_import_at(&self, offset: usize) -> Option<ImportReference> {
        let opcode_offset = offset.checked_sub(1)?;
        let mut resolved: Option<&ExportInfo> = None;

        for module in self.modules {
            let opcode = module.read_u8(opcode_offset)?;
            if opcode != CALL_REL && opcode != JMP_REL {
                return None;
            }

            let import = module.export_for(self.relative_target(module, offset)?)?;
            match resolved {
                Some(first) if first != import => return None,
                Some(_) => {}
                None => resolved = Some(import),
            }
        }

        resolved.map(|import| ImportReference {
            offset: offset as u64,
            import: import.clone(),
            is_relative: true,
        })
    }

    /// Branch target of a displacement stored at `offset`: the address right
    /// after the displacement plus the signed displacement.
    fn relative_target(&self, module: &LoadedModule, offset: usize) -> Option<Address> {
        let displacement = module.read_displacement(offset, self.width)?;
        let next = module
            .base_address()
            .wrapping_add((offset + self.width.bytes()) as u64);
        let target = next.wrapping_offset(displacement);
        Some(Address::new(self.width.truncate(target.as_u64())))
    }

    fn memory_reference_at(&self, offset: usize) -> Option<DirectMemoryReference> {
        let reference = &self.modules[0];
        let first = reference.direct_reference_for(self.value(reference, offset)?)?;

        for module in &self.modules[1..] {
            let other = module.direct_reference_for(self.value(module, offset)?)?;
            if other != first {
                return None;
            }
        }

        Some(DirectMemoryReference {
            offset: offset as u64,
            module_name: first.module_name,
            rva: first.rva,
        })
    }
}
