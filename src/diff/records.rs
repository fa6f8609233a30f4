// Tue Jan 20 2026 - Alex

use crate::memory::ExportInfo;
use std::fmt;

/// A pointer the loader itself would have fixed up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationRecord {
    /// Offset into the image where the pointer is stored
    pub offset: u64,
    /// Where the pointer points, relative to the module's own base
    pub rva: u64,
}

/// A slot holding the address of (or a call displacement to) another module's export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    pub offset: u64,
    pub import: ExportInfo,
    /// Encoded as a call/jmp displacement instead of an absolute pointer
    pub is_relative: bool,
}

/// A pointer to a fixed, non-exported location inside another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMemoryReference {
    pub offset: u64,
    pub module_name: String,
    /// Relative to the referenced module's base, not ours
    pub rva: u64,
}

/// The outcome of classifying a single offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Relocation(RelocationRecord),
    Import(ImportReference),
    MemoryReference(DirectMemoryReference),
}

impl Finding {
    pub fn offset(&self) -> u64 {
        match self {
            Self::Relocation(r) => r.offset,
            Self::Import(i) => i.offset,
            Self::MemoryReference(m) => m.offset,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Relocation(_) => "relocation",
            Self::Import(i) if i.is_relative => "relative import",
            Self::Import(_) => "import",
            Self::MemoryReference(_) => "memory reference",
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relocation(r) => write!(f, "{:#x}: relocation -> rva {:#x}", r.offset, r.rva),
            Self::Import(i) => write!(f, "{:#x}: {} -> {}", i.offset, self.kind(), i.import),
            Self::MemoryReference(m) => {
                write!(f, "{:#x}: memory reference -> {}+{:#x}", m.offset, m.module_name, m.rva)
            }
        }
    }
}
