// Tue Jan 20 2026 - Alex

use crate::diff::rebuild::RebuildData;
use crate::diff::records::{DirectMemoryReference, Finding, ImportReference, RelocationRecord};
use crate::memory::PointerWidth;
use std::fmt;

/// Everything one scan produced: the flat record lists handed to the records
/// file and the grouped data handed to the section builders. Append-only.
#[derive(Debug, Clone)]
pub struct ScanResults {
    relocations: Vec<RelocationRecord>,
    imports: Vec<ImportReference>,
    memory_references: Vec<DirectMemoryReference>,
    rebuild: RebuildData,
}

impl ScanResults {
    pub fn new(width: PointerWidth) -> Self {
        Self {
            relocations: Vec::new(),
            imports: Vec::new(),
            memory_references: Vec::new(),
            rebuild: RebuildData::new(width),
        }
    }

    /// Records a finding. Findings must arrive in ascending offset order for
    /// import runs to come out right.
    pub fn record(&mut self, finding: Finding) {
        match finding {
            Finding::Relocation(reloc) => {
                self.rebuild.add_relocation(reloc.offset);
                self.relocations.push(reloc);
            }
            Finding::Import(import) => {
                self.rebuild.add_import(&import);
                self.imports.push(import);
            }
            Finding::MemoryReference(memref) => {
                self.memory_references.push(memref);
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = Finding>>(&mut self, findings: I) {
        for finding in findings {
            self.record(finding);
        }
    }

    pub fn relocations(&self) -> &[RelocationRecord] {
        &self.relocations
    }

    pub fn imports(&self) -> &[ImportReference] {
        &self.imports
    }

    pub fn memory_references(&self) -> &[DirectMemoryReference] {
        &self.memory_references
    }

    pub fn rebuild_data(&self) -> &RebuildData {
        &self.rebuild
    }

    pub fn relative_import_count(&self) -> usize {
        self.imports.iter().filter(|i| i.is_relative).count()
    }

    pub fn total_count(&self) -> usize {
        self.relocations.len() + self.imports.len() + self.memory_references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }
}

impl fmt::Display for ScanResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} relocations, {} import references ({} relative), {} direct memory references",
            self.relocations.len(),
            self.imports.len(),
            self.relative_import_count(),
            self.memory_references.len()
        )
    }
}
