// Tue Jan 20 2026 - Alex

use crate::diff::records::ImportReference;
use crate::memory::PointerWidth;
use std::collections::BTreeMap;

pub const PAGE_SIZE: u64 = 0x1000;

/// A maximal contiguous, same-module block of absolute import slots. Each run
/// becomes one import descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRun {
    entries: Vec<ImportReference>,
}

impl ImportRun {
    fn start(first: ImportReference) -> Self {
        Self { entries: vec![first] }
    }

    pub fn module_name(&self) -> &str {
        &self.entries[0].import.module_name
    }

    /// Offset of the first slot, the descriptor's FirstThunk
    pub fn start_offset(&self) -> u64 {
        self.entries[0].offset
    }

    pub fn entries(&self) -> &[ImportReference] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Groups classified facts the way the rebuilt sections need them:
/// relocations by page, absolute imports by contiguous run.
#[derive(Debug, Clone)]
pub struct RebuildData {
    width: PointerWidth,
    relocation_pages: BTreeMap<u64, Vec<u16>>,
    import_runs: Vec<ImportRun>,
}

impl RebuildData {
    pub fn new(width: PointerWidth) -> Self {
        Self {
            width,
            relocation_pages: BTreeMap::new(),
            import_runs: Vec::new(),
        }
    }

    pub fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    pub fn add_relocation(&mut self, offset: u64) {
        let page = offset & !(PAGE_SIZE - 1);
        self.relocation_pages
            .entry(page)
            .or_default()
            .push((offset - page) as u16);
    }

    /// Adds an import reference to the run grouping. Relative references are
    /// ignored. Returns true if the reference opened a new run.
    pub fn add_import(&mut self, reference: &ImportReference) -> bool {
        if reference.is_relative {
            return false;
        }

        let width = self.width.bytes() as u64;
        if let Some(run) = self.import_runs.last_mut() {
            let previous = &run.entries[run.entries.len() - 1];
            let contiguous = reference.offset.checked_sub(previous.offset) == Some(width);
            if contiguous && previous.import.module_name == reference.import.module_name {
                run.entries.push(reference.clone());
                return false;
            }
        }

        log::debug!(
            "New import run for {} at {:#x}",
            reference.import.module_name,
            reference.offset
        );
        self.import_runs.push(ImportRun::start(reference.clone()));
        true
    }

    /// Page-aligned block address -> in-page offsets, ascending by page.
    pub fn relocation_pages(&self) -> &BTreeMap<u64, Vec<u16>> {
        &self.relocation_pages
    }

    pub fn relocation_count(&self) -> usize {
        self.relocation_pages.values().map(Vec::len).sum()
    }

    pub fn import_runs(&self) -> &[ImportRun] {
        &self.import_runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ExportInfo;

    fn import(offset: u64, module: &str, export: &str, relative: bool) -> ImportReference {
        ImportReference {
            offset,
            import: ExportInfo::new(module, export),
            is_relative: relative,
        }
    }

    #[test]
    fn test_relocations_grouped_by_page() {
        let mut data = RebuildData::new(PointerWidth::Bits64);
        data.add_relocation(0x1008);
        data.add_relocation(0x1ff8);
        data.add_relocation(0x3000);

        let pages: Vec<_> = data.relocation_pages().iter().collect();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], (&0x1000, &vec![0x008, 0xff8]));
        assert_eq!(pages[1], (&0x3000, &vec![0x000]));
        assert_eq!(data.relocation_count(), 3);
    }

    #[test]
    fn test_contiguous_same_module_imports_form_one_run() {
        let mut data = RebuildData::new(PointerWidth::Bits64);
        assert!(data.add_import(&import(0x2000, "kernel32.dll", "A", false)));
        assert!(!data.add_import(&import(0x2008, "kernel32.dll", "B", false)));
        assert!(!data.add_import(&import(0x2010, "kernel32.dll", "C", false)));
        assert!(!data.add_import(&import(0x2018, "kernel32.dll", "D", false)));

        assert_eq!(data.import_runs().len(), 1);
        assert_eq!(data.import_runs()[0].len(), 4);
        assert_eq!(data.import_runs()[0].start_offset(), 0x2000);
    }

    #[test]
    fn test_gap_splits_run() {
        let mut data = RebuildData::new(PointerWidth::Bits64);
        data.add_import(&import(0x2000, "kernel32.dll", "A", false));
        data.add_import(&import(0x2008, "kernel32.dll", "B", false));
        data.add_import(&import(0x2018, "kernel32.dll", "C", false));

        let runs = data.import_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 2);
        assert_eq!(runs[1].start_offset(), 0x2018);
    }

    #[test]
    fn test_module_change_splits_run() {
        let mut data = RebuildData::new(PointerWidth::Bits32);
        data.add_import(&import(0x2000, "kernel32.dll", "A", false));
        data.add_import(&import(0x2004, "kernel32.dll", "B", false));
        data.add_import(&import(0x2008, "user32.dll", "C", false));
        data.add_import(&import(0x200c, "user32.dll", "D", false));

        let runs = data.import_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].module_name(), "kernel32.dll");
        assert_eq!(runs[1].module_name(), "user32.dll");
        assert_eq!(runs[1].len(), 2);
    }

    #[test]
    fn test_relative_imports_never_touch_runs() {
        let mut data = RebuildData::new(PointerWidth::Bits32);
        data.add_import(&import(0x2000, "kernel32.dll", "A", false));
        assert!(!data.add_import(&import(0x2004, "kernel32.dll", "B", true)));
        data.add_import(&import(0x2008, "kernel32.dll", "C", false));

        let runs = data.import_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 1);
        assert_eq!(runs[1].len(), 1);

        let mut only_relative = RebuildData::new(PointerWidth::Bits32);
        only_relative.add_import(&import(0x10, "a.dll", "f", true));
        assert!(only_relative.import_runs().is_empty());
    }
}
