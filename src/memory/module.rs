// Mon Jan 19 2026 - Alex

use crate::memory::{Address, DumpError, ExportInfo, ExportMap, MemoryRange, PointerWidth};
use crate::utils::BinaryUtils;
use std::fs;
use std::path::Path;

pub const DEFAULT_IMAGE_NAME: &str = "mem.bin";
pub const DEFAULT_EXPORTS_NAME: &str = "exports.txt";

/// A pointer into another mapped module, expressed relative to that module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectReference {
    pub module_name: String,
    pub rva: u64,
}

/// One memory dump of the module under reconstruction.
///
/// Owns the raw image bytes, the base address the image was mapped at when it
/// was dumped, and the export map captured alongside it.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    label: String,
    image: Vec<u8>,
    range: MemoryRange,
    exports: ExportMap,
}

impl LoadedModule {
    pub fn new(image: Vec<u8>, base_address: Address, exports: ExportMap) -> Result<Self, DumpError> {
        Self::with_label("<memory>", image, base_address, exports)
    }

    pub fn with_label(
        label: &str,
        image: Vec<u8>,
        base_address: Address,
        exports: ExportMap,
    ) -> Result<Self, DumpError> {
        let range = MemoryRange::new(base_address, image.len() as u64).ok_or_else(|| {
            DumpError::RangeOverflow {
                module: label.to_string(),
                base: base_address.as_u64(),
                size: image.len() as u64,
            }
        })?;

        for (a, b) in exports.overlapping_modules() {
            log::warn!(
                "{}: module ranges overlap, {} {} and {} {}; direct references resolve to the first",
                label,
                a.name,
                a.range,
                b.name,
                b.range
            );
        }

        Ok(Self {
            label: label.to_string(),
            image,
            range,
            exports,
        })
    }

    /// Loads `<folder>/mem.bin` and `<folder>/exports.txt`.
    pub fn load<P: AsRef<Path>>(folder: P, base_address: Address) -> Result<Self, DumpError> {
        Self::load_with_names(folder, base_address, DEFAULT_IMAGE_NAME, DEFAULT_EXPORTS_NAME)
    }

    pub fn load_with_names<P: AsRef<Path>>(
        folder: P,
        base_address: Address,
        image_name: &str,
        exports_name: &str,
    ) -> Result<Self, DumpError> {
        let folder = folder.as_ref();
        let image_path = folder.join(image_name);
        let image = read_dump(&image_path)?;

        let exports_path = folder.join(exports_name);
        let exports = ExportMap::load(&exports_path)?;

        log::info!(
            "Created reverse export lookup table from {} for {} items",
            exports_path.display(),
            exports.export_count()
        );

        Self::with_label(&folder.display().to_string(), image, base_address, exports)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn image_size(&self) -> usize {
        self.image.len()
    }

    pub fn base_address(&self) -> Address {
        self.range.start()
    }

    pub fn exports(&self) -> &ExportMap {
        &self.exports
    }

    /// True iff `base <= addr <= base + image_size`.
    pub fn contains_address(&self, addr: Address) -> bool {
        self.range.contains(addr)
    }

    /// `addr - base`. Callers check `contains_address` first; no bounds check
    /// is done here.
    pub fn rva_of(&self, addr: Address) -> u64 {
        addr.as_u64().wrapping_sub(self.base_address().as_u64())
    }

    pub fn export_for(&self, addr: Address) -> Option<&ExportInfo> {
        self.exports.lookup(addr)
    }

    /// First other module, in export-map order, whose range holds `addr`.
    pub fn direct_reference_for(&self, addr: Address) -> Option<DirectReference> {
        self.exports
            .modules()
            .iter()
            .find(|m| m.range.contains(addr))
            .map(|m| DirectReference {
                module_name: m.name.clone(),
                rva: addr.as_u64() - m.base_address().as_u64(),
            })
    }

    pub fn read_pointer(&self, offset: usize, width: PointerWidth) -> Option<u64> {
        width.read(&self.image, offset)
    }

    pub fn read_displacement(&self, offset: usize, width: PointerWidth) -> Option<i64> {
        width.read_signed(&self.image, offset)
    }

    pub fn read_u8(&self, offset: usize) -> Option<u8> {
        BinaryUtils::read_u8(&self.image, offset)
    }
}

fn read_dump(path: &Path) -> Result<Vec<u8>, DumpError> {
    let expected = fs::metadata(path).map_err(|e| DumpError::io(path, e))?.len();
    let image = fs::read(path).map_err(|e| DumpError::io(path, e))?;

    if image.len() as u64 != expected {
        return Err(DumpError::Truncated {
            path: path.to_path_buf(),
            expected,
            read: image.len(),
        });
    }
    if image.is_empty() {
        return Err(DumpError::EmptyImage(path.to_path_buf()));
    }

    Ok(image)
}
