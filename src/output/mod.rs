// Wed Jan 21 2026 - Alex

pub mod json;

pub use json::{RecordsSerializer, DEFAULT_RECORDS_NAME};

use crate::diff::{DirectMemoryReference, ImportReference, RelocationRecord, ScanResults};
use crate::memory::ExportInfo;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed records file: {0}")]
    Json(#[from] serde_json::Error),
}

/// The `reloc_info` hand-off document read by the loader.
///
/// Field order is the on-disk key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsFile {
    #[serde(rename = "IAT", default, deserialize_with = "null_as_empty")]
    pub imports: Vec<ImportEntry>,
    #[serde(rename = "MEMREF", default, deserialize_with = "null_as_empty")]
    pub memory_references: Vec<MemoryReferenceEntry>,
    #[serde(rename = "RELOCS", default, deserialize_with = "null_as_empty")]
    pub relocations: Vec<RelocationEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEntry {
    #[serde(rename = "EXPORT")]
    pub export: String,
    #[serde(rename = "MODULE")]
    pub module: String,
    #[serde(rename = "OFFSET")]
    pub offset: u64,
    #[serde(rename = "RELATIVE", default)]
    pub relative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReferenceEntry {
    #[serde(rename = "MODULE")]
    pub module: String,
    #[serde(rename = "OFFSET")]
    pub offset: u64,
    #[serde(rename = "RVA")]
    pub rva: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationEntry {
    #[serde(rename = "OFFSET")]
    pub offset: u64,
    #[serde(rename = "RVA")]
    pub rva: u64,
}

// nlohmann-style writers emit `null` for groups that were never assigned.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RecordsFile {
    pub fn from_results(results: &ScanResults) -> Self {
        Self {
            imports: results.imports().iter().map(ImportEntry::from).collect(),
            memory_references: results
                .memory_references()
                .iter()
                .map(MemoryReferenceEntry::from)
                .collect(),
            relocations: results.relocations().iter().map(RelocationEntry::from).collect(),
        }
    }

    pub fn total_count(&self) -> usize {
        self.imports.len() + self.memory_references.len() + self.relocations.len()
    }
}

impl From<&RelocationRecord> for RelocationEntry {
    fn from(record: &RelocationRecord) -> Self {
        Self {
            offset: record.offset,
            rva: record.rva,
        }
    }
}

impl From<&ImportReference> for ImportEntry {
    fn from(reference: &ImportReference) -> Self {
        Self {
            export: reference.import.export_name.clone(),
            module: reference.import.module_name.clone(),
            offset: reference.offset,
            relative: reference.is_relative,
        }
    }
}

impl From<&DirectMemoryReference> for MemoryReferenceEntry {
    fn from(reference: &DirectMemoryReference) -> Self {
        Self {
            module: reference.module_name.clone(),
            offset: reference.offset,
            rva: reference.rva,
        }
    }
}

impl ImportEntry {
    pub fn export_info(&self) -> ExportInfo {
        ExportInfo::new(&self.module, &self.export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Finding;
    use crate::memory::PointerWidth;

    #[test]
    fn test_from_results_keeps_scan_order() {
        let mut results = ScanResults::new(PointerWidth::Bits64);
        results.record(Finding::Relocation(RelocationRecord { offset: 0x10, rva: 0x20 }));
        results.record(Finding::Import(ImportReference {
            offset: 0x30,
            import: ExportInfo::new("kernel32.dll", "Sleep"),
            is_relative: true,
        }));
        results.record(Finding::Relocation(RelocationRecord { offset: 0x40, rva: 0x50 }));
        results.record(Finding::MemoryReference(DirectMemoryReference {
            offset: 0x60,
            module_name: "ntdll.dll".to_string(),
            rva: 0x70,
        }));

        let file = RecordsFile::from_results(&results);
        assert_eq!(
            file.relocations,
            vec![
                RelocationEntry { offset: 0x10, rva: 0x20 },
                RelocationEntry { offset: 0x40, rva: 0x50 },
            ]
        );
        assert!(file.imports[0].relative);
        assert_eq!(file.imports[0].export_info().to_string(), "kernel32.dll!Sleep");
        assert_eq!(file.memory_references[0].module, "ntdll.dll");
        assert_eq!(file.total_count(), 4);
    }
}
