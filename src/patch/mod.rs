// Thu Jan 22 2026 - Alex

use crate::memory::{Address, ExportMap, PointerWidth};
use crate::output::RecordsFile;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Unable to resolve import {module}!{export}")]
    UnresolvedImport { module: String, export: String },
    #[error("Module {0} is not loaded")]
    UnknownModule(String),
    #[error("Offset {offset:#x} is outside the {len:#x} byte image")]
    OutOfRange { offset: u64, len: usize },
}

/// Where the loader finds the live addresses it patches in.
pub trait SymbolResolver {
    fn resolve_export(&self, module: &str, export: &str) -> Option<Address>;

    fn module_base(&self, module: &str) -> Option<Address>;
}

/// Resolves against an export map captured from the target process.
pub struct ExportMapResolver {
    exports: ExportMap,
}

impl ExportMapResolver {
    pub fn new(exports: ExportMap) -> Self {
        Self { exports }
    }
}

impl SymbolResolver for ExportMapResolver {
    fn resolve_export(&self, module: &str, export: &str) -> Option<Address> {
        self.exports.resolve(module, export)
    }

    fn module_base(&self, module: &str) -> Option<Address> {
        self.exports.module(module).map(|m| m.base_address())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub relocations: usize,
    pub imports: usize,
    pub relative_imports: usize,
    pub memory_references: usize,
}

impl fmt::Display for PatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} relocations, {} imports ({} relative), {} memory references",
            self.relocations, self.imports, self.relative_imports, self.memory_references
        )
    }
}

/// Applies a records file to a raw image copy that will live at `image_base`.
///
/// Relocations get `image_base + RVA`, absolute imports the resolved export
/// address, relative imports the displacement from the end of the slot to
/// the export, memory references the referenced module's base plus RVA.
pub struct ImagePatcher<'a, R: SymbolResolver> {
    resolver: &'a R,
    width: PointerWidth,
    image_base: Address,
}

impl<'a, R: SymbolResolver> ImagePatcher<'a, R> {
    pub fn new(resolver: &'a R, width: PointerWidth, image_base: Address) -> Self {
        Self {
            resolver,
            width,
            image_base,
        }
    }

    pub fn apply(&self, image: &mut [u8], records: &RecordsFile) -> Result<PatchStats, PatchError> {
        let mut stats = PatchStats::default();

        log::info!("Patching relocations...");
        for reloc in &records.relocations {
            self.write(image, reloc.offset, self.image_base.wrapping_add(reloc.rva).as_u64())?;
            stats.relocations += 1;
        }

        log::info!("Patching imports...");
        for import in &records.imports {
            let target = self
                .resolver
                .resolve_export(&import.module, &import.export)
                .ok_or_else(|| PatchError::UnresolvedImport {
                    module: import.module.clone(),
                    export: import.export.clone(),
                })?;

            let value = if import.relative {
                stats.relative_imports += 1;
                let next = self
                    .image_base
                    .wrapping_add(import.offset)
                    .wrapping_add(self.width.bytes() as u64);
                target.as_u64().wrapping_sub(next.as_u64())
            } else {
                target.as_u64()
            };

            self.write(image, import.offset, value)?;
            stats.imports += 1;
        }

        log::info!("Patching memory references...");
        for memref in &records.memory_references {
            let base = self
                .resolver
                .module_base(&memref.module)
                .ok_or_else(|| PatchError::UnknownModule(memref.module.clone()))?;
            self.write(image, memref.offset, base.wrapping_add(memref.rva).as_u64())?;
            stats.memory_references += 1;
        }

        log::debug!("Patched {}", stats);
        Ok(stats)
    }

    fn write(&self, image: &mut [u8], offset: u64, value: u64) -> Result<(), PatchError> {
        let len = image.len();
        let out_of_range = || PatchError::OutOfRange { offset, len };
        let at = usize::try_from(offset).map_err(|_| out_of_range())?;
        if self.width.write(image, at, value) {
            Ok(())
        } else {
            Err(out_of_range())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ImportEntry, MemoryReferenceEntry, RelocationEntry};

    fn resolver() -> ExportMapResolver {
        let mut map = ExportMap::new();
        map.add_module("kernel32.dll", Address::new(0x7700_0000), 0x10_0000).unwrap();
        map.add_export("kernel32.dll", "Sleep", Address::new(0x7700_1300));
        map.add_module("ntdll.dll", Address::new(0x7800_0000), 0x10_0000).unwrap();
        ExportMapResolver::new(map)
    }

    fn records() -> RecordsFile {
        RecordsFile {
            imports: vec![
                ImportEntry {
                    export: "Sleep".to_string(),
                    module: "KERNEL32.dll".to_string(),
                    offset: 0x10,
                    relative: false,
                },
                ImportEntry {
                    export: "Sleep".to_string(),
                    module: "kernel32.dll".to_string(),
                    offset: 0x21,
                    relative: true,
                },
            ],
            memory_references: vec![MemoryReferenceEntry {
                module: "ntdll.dll".to_string(),
                offset: 0x30,
                rva: 0x40,
            }],
            relocations: vec![RelocationEntry { offset: 0x0, rva: 0x123 }],
        }
    }

    #[test]
    fn test_apply_writes_every_kind() {
        let resolver = resolver();
        let mut image = vec![0u8; 0x40];
        let patcher = ImagePatcher::new(&resolver, PointerWidth::Bits32, Address::new(0x40_0000));

        let stats = patcher.apply(&mut image, &records()).unwrap();
        assert_eq!(
            stats,
            PatchStats {
                relocations: 1,
                imports: 2,
                relative_imports: 1,
                memory_references: 1,
            }
        );

        let width = PointerWidth::Bits32;
        assert_eq!(width.read(&image, 0), Some(0x40_0123));
        assert_eq!(width.read(&image, 0x10), Some(0x7700_1300));
        assert_eq!(width.read(&image, 0x21), Some(0x7700_1300 - (0x40_0000 + 0x21 + 4)));
        assert_eq!(width.read(&image, 0x30), Some(0x7800_0040));
    }

    #[test]
    fn test_unresolved_import_fails() {
        let resolver = ExportMapResolver::new(ExportMap::new());
        let mut image = vec![0u8; 0x40];
        let patcher = ImagePatcher::new(&resolver, PointerWidth::Bits64, Address::new(0x40_0000));
        let mut records = records();
        records.relocations.clear();

        assert!(matches!(
            patcher.apply(&mut image, &records),
            Err(PatchError::UnresolvedImport { .. })
        ));
    }

    #[test]
    fn test_offset_past_end_fails() {
        let resolver = resolver();
        let mut image = vec![0u8; 8];
        let patcher = ImagePatcher::new(&resolver, PointerWidth::Bits64, Address::new(0));
        let records = RecordsFile {
            relocations: vec![RelocationEntry { offset: 4, rva: 0 }],
            ..Default::default()
        };

        assert_eq!(
            patcher.apply(&mut image, &records),
            Err(PatchError::OutOfRange { offset: 4, len: 8 })
        );
    }
}
