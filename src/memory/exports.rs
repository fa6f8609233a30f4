// Mon Jan 19 2026 - Alex

use crate::memory::{Address, DumpError, MemoryRange};
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// `module!export` identity of an exported symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportInfo {
    pub module_name: String,
    pub export_name: String,
}

impl ExportInfo {
    pub fn new(module_name: &str, export_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            export_name: export_name.to_string(),
        }
    }
}

impl fmt::Display for ExportInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.module_name, self.export_name)
    }
}

/// Another module that was mapped in the dumped process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedModule {
    pub name: String,
    pub range: MemoryRange,
}

impl MappedModule {
    pub fn base_address(&self) -> Address {
        self.range.start()
    }

    pub fn size_of_image(&self) -> u64 {
        self.range.size()
    }
}

#[derive(Debug, Deserialize)]
struct RawModuleEntry {
    #[serde(rename = "BASEADDR")]
    base_address: u64,
    #[serde(rename = "SIZEOFIMAGE")]
    size_of_image: u64,
    #[serde(flatten)]
    exports: IndexMap<String, u64>,
}

/// Per-dump listing of every live module and its exports.
///
/// On disk this is a JSON object keyed by module name; each value carries
/// `BASEADDR`, `SIZEOFIMAGE` and one `export name -> absolute address` entry
/// per export. Module order is kept as written.
#[derive(Debug, Clone, Default)]
pub struct ExportMap {
    modules: Vec<MappedModule>,
    reverse: AHashMap<u64, ExportInfo>,
    forward: AHashMap<String, AHashMap<String, u64>>,
}

impl ExportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DumpError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| DumpError::io(path, e))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, DumpError> {
        let raw: IndexMap<String, RawModuleEntry> = serde_json::from_str(contents)
            .map_err(|e| DumpError::ExportMapParse(e.to_string()))?;

        let mut map = Self::new();
        for (module_name, entry) in raw {
            map.add_module(&module_name, Address::new(entry.base_address), entry.size_of_image)?;
            for (export_name, address) in entry.exports {
                map.add_export(&module_name, &export_name, Address::new(address));
            }
        }

        Ok(map)
    }

    pub fn add_module(&mut self, name: &str, base: Address, size: u64) -> Result<(), DumpError> {
        let range = MemoryRange::new(base, size).ok_or_else(|| DumpError::RangeOverflow {
            module: name.to_string(),
            base: base.as_u64(),
            size,
        })?;

        self.modules.push(MappedModule {
            name: name.to_string(),
            range,
        });
        Ok(())
    }

    /// Registers an export. When two exports share an address the first one
    /// registered keeps the reverse mapping.
    pub fn add_export(&mut self, module_name: &str, export_name: &str, address: Address) {
        self.forward
            .entry(module_name.to_ascii_lowercase())
            .or_default()
            .insert(export_name.to_string(), address.as_u64());

        if let Some(existing) = self.reverse.get(&address.as_u64()) {
            log::debug!(
                "{} aliases {} at {}, keeping the first",
                ExportInfo::new(module_name, export_name),
                existing,
                address
            );
            return;
        }

        self.reverse
            .insert(address.as_u64(), ExportInfo::new(module_name, export_name));
    }

    pub fn lookup(&self, address: Address) -> Option<&ExportInfo> {
        self.reverse.get(&address.as_u64())
    }

    /// Forward lookup, module names compared case-insensitively.
    pub fn resolve(&self, module_name: &str, export_name: &str) -> Option<Address> {
        self.forward
            .get(&module_name.to_ascii_lowercase())?
            .get(export_name)
            .map(|&a| Address::new(a))
    }

    pub fn modules(&self) -> &[MappedModule] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&MappedModule> {
        self.modules.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn export_count(&self) -> usize {
        self.reverse.len()
    }

    /// Pairs of modules whose ranges overlap, in file order.
    pub fn overlapping_modules(&self) -> Vec<(&MappedModule, &MappedModule)> {
        let mut overlaps = Vec::new();
        for (i, a) in self.modules.iter().enumerate() {
            for b in &self.modules[i + 1..] {
                if a.range.overlaps(&b.range) {
                    overlaps.push((a, b));
                }
            }
        }
        overlaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "kernel32.dll": {
            "BASEADDR": 1996554240,
            "SIZEOFIMAGE": 983040,
            "GetProcAddress": 1996631616,
            "LoadLibraryA": 1996633184
        },
        "user32.dll": {
            "BASEADDR": 1979711488,
            "SIZEOFIMAGE": 1638400,
            "MessageBoxA": 1980231056
        }
    }"#;

    #[test]
    fn test_parse_export_map() {
        let map = ExportMap::parse(SAMPLE).unwrap();
        assert_eq!(map.modules().len(), 2);
        assert_eq!(map.modules()[0].name, "kernel32.dll");
        assert_eq!(map.modules()[1].name, "user32.dll");
        assert_eq!(map.export_count(), 3);

        let info = map.lookup(Address::new(1996631616)).unwrap();
        assert_eq!(info, &ExportInfo::new("kernel32.dll", "GetProcAddress"));
        assert!(map.lookup(Address::new(1996554240)).is_none());
    }

    #[test]
    fn test_base_and_size_are_not_exports() {
        let map = ExportMap::parse(SAMPLE).unwrap();
        assert!(map.resolve("kernel32.dll", "BASEADDR").is_none());
        assert!(map.resolve("kernel32.dll", "SIZEOFIMAGE").is_none());
        assert_eq!(
            map.resolve("KERNEL32.DLL", "LoadLibraryA"),
            Some(Address::new(1996633184))
        );
    }

    #[test]
    fn test_malformed_map_is_rejected() {
        assert!(matches!(
            ExportMap::parse("{ \"a.dll\": { \"BASEADDR\": 1 } }"),
            Err(DumpError::ExportMapParse(_))
        ));
        assert!(matches!(
            ExportMap::parse("not json"),
            Err(DumpError::ExportMapParse(_))
        ));
        assert!(matches!(
            ExportMap::parse("{ \"a.dll\": { \"BASEADDR\": 1, \"SIZEOFIMAGE\": 2, \"f\": \"x\" } }"),
            Err(DumpError::ExportMapParse(_))
        ));
    }

    #[test]
    fn test_aliased_export_keeps_first() {
        let mut map = ExportMap::new();
        map.add_module("ntdll.dll", Address::new(0x1000), 0x1000).unwrap();
        map.add_export("ntdll.dll", "RtlFirst", Address::new(0x1100));
        map.add_export("ntdll.dll", "RtlSecond", Address::new(0x1100));
        assert_eq!(map.lookup(Address::new(0x1100)).unwrap().export_name, "RtlFirst");
    }

    #[test]
    fn test_overlapping_modules() {
        let mut map = ExportMap::new();
        map.add_module("a.dll", Address::new(0x1000), 0x1000).unwrap();
        map.add_module("b.dll", Address::new(0x1800), 0x1000).unwrap();
        map.add_module("c.dll", Address::new(0x2800), 0x1000).unwrap();
        let overlaps = map.overlapping_modules();
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].0.name, "a.dll");
        assert_eq!(overlaps[0].1.name, "b.dll");
    }
}
