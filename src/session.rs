// Thu Jan 22 2026 - Alex

use crate::config::Config;
use crate::diff::{ClassifyError, DifferentialClassifier, ScanResults};
use crate::memory::{Address, DumpError, LoadedModule};
use crate::output::{RecordsError, RecordsFile, RecordsSerializer};
use crate::section::{ImageAssembler, RebuiltImage, SectionError};
use crate::utils::parse_hex_address;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Dump(#[from] DumpError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Records(#[from] RecordsError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the rebuilt image went and what it contains.
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub path: PathBuf,
    pub size: usize,
    pub relocation_range: Range<usize>,
    pub import_range: Option<Range<usize>>,
    pub headers_patched: bool,
}

#[derive(Debug)]
pub struct SessionReport {
    pub results: ScanResults,
    pub records_path: PathBuf,
    /// `None` if the sections could not be built.
    pub image: Option<ImageSummary>,
}

/// Parses an operator-supplied base address (hex, `0x` optional).
pub fn parse_base_address(s: &str) -> Result<Address, DumpError> {
    match parse_hex_address(s) {
        Some(value) if value != 0 => Ok(Address::new(value)),
        _ => Err(DumpError::InvalidBaseAddress(s.trim().to_string())),
    }
}

/// One rebuild run. Owns every dump; dump 0 is the reference.
pub struct Session {
    config: Config,
    modules: Vec<LoadedModule>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            modules: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn modules(&self) -> &[LoadedModule] {
        &self.modules
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Loads a dump folder. On failure nothing is added.
    pub fn add_dump<P: AsRef<Path>>(&mut self, folder: P, base_address: Address) -> Result<&LoadedModule, DumpError> {
        let module = LoadedModule::load_with_names(
            folder,
            base_address,
            &self.config.dump_image_name,
            &self.config.exports_name,
        )?;

        log::info!(
            "Loaded dump {} ({:#x} bytes at {})",
            module.label(),
            module.image_size(),
            module.base_address()
        );
        Ok(self.add_module(module))
    }

    pub fn add_module(&mut self, module: LoadedModule) -> &LoadedModule {
        if let Some(other) = self.modules.iter().find(|m| m.base_address() == module.base_address()) {
            log::warn!(
                "{} shares base {} with {}; nothing will classify as a relocation",
                module.label(),
                module.base_address(),
                other.label()
            );
        }

        let index = self.modules.len();
        self.modules.push(module);
        &self.modules[index]
    }

    pub fn classifier(&self) -> Result<DifferentialClassifier<'_>, ClassifyError> {
        DifferentialClassifier::new(&self.modules, self.config.pointer_width)?.with_stride(self.config.stride)
    }

    pub fn scan<F: FnMut(usize)>(&self, progress: F) -> Result<ScanResults, ClassifyError> {
        let classifier = self.classifier()?;
        log::info!("Scanning {} dumps...", self.modules.len());

        let results = if self.config.parallel {
            classifier.scan_parallel(self.config.threads, progress)
        } else {
            classifier.scan_with_progress(progress)
        };

        log::info!("Found {}", results);
        Ok(results)
    }

    pub fn rebuild_image(&self, results: &ScanResults) -> Result<RebuiltImage, SessionError> {
        let reference = self.reference()?;
        let image = ImageAssembler::new(reference.image(), results.rebuild_data())
            .with_header_patch(self.config.patch_headers)
            .assemble()?;
        Ok(image)
    }

    pub fn write_records(&self, results: &ScanResults) -> Result<RecordsFile, RecordsError> {
        let records = RecordsFile::from_results(results);
        RecordsSerializer::new().write_file(&records, &self.config.records_file)?;
        Ok(records)
    }

    pub fn write_image(&self, image: &RebuiltImage) -> Result<ImageSummary, SessionError> {
        let path = self.config.output_image.clone();
        fs::write(&path, image.bytes()).map_err(|source| SessionError::Io {
            path: path.clone(),
            source,
        })?;

        log::info!("Writing relocated binary to disk as {}", path.display());
        Ok(ImageSummary {
            path,
            size: image.len(),
            relocation_range: image.relocation_range().clone(),
            import_range: image.import_range().cloned(),
            headers_patched: image.headers_patched(),
        })
    }

    /// Scan, then write the records file and the rebuilt image. A section
    /// failure only loses the image.
    pub fn run<F: FnMut(usize)>(&self, progress: F) -> Result<SessionReport, SessionError> {
        let results = self.scan(progress)?;
        self.write_records(&results)?;

        let image = match self.rebuild_image(&results) {
            Ok(image) => Some(self.write_image(&image)?),
            Err(e) => {
                log::error!("Failed to create sections, no image written: {}", e);
                None
            }
        };

        Ok(SessionReport {
            results,
            records_path: self.config.records_file.clone(),
            image,
        })
    }

    fn reference(&self) -> Result<&LoadedModule, ClassifyError> {
        self.modules
            .first()
            .ok_or(ClassifyError::NotEnoughModules(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::PointerWidth;

    const BASE_A: u64 = 0x1000_0000;
    const BASE_B: u64 = 0x2000_0000;

    fn write_dump(dir: &Path, base: u64, k32: u64) {
        fs::create_dir_all(dir).unwrap();
        let mut image = vec![0u8; 0x2000];
        PointerWidth::Bits64.write(&mut image, 0x1010, base + 0x1abc);
        PointerWidth::Bits64.write(&mut image, 0x1800, k32 + 0x100);
        PointerWidth::Bits64.write(&mut image, 0x1808, k32 + 0x200);
        fs::write(dir.join("mem.bin"), &image).unwrap();

        let exports = format!(
            r#"{{"kernel32.dll": {{"BASEADDR": {}, "SIZEOFIMAGE": 65536, "Sleep": {}, "GetProcAddress": {}}}}}"#,
            k32,
            k32 + 0x100,
            k32 + 0x200
        );
        fs::write(dir.join("exports.txt"), exports).unwrap();
    }

    fn session_in(dir: &Path) -> Session {
        let config = Config::default()
            .with_output_image(dir.join("relocated.dll"))
            .with_records_file(dir.join("reloc_info.txt"))
            .with_threads(2);
        let mut session = Session::new(config);
        write_dump(&dir.join("a"), BASE_A, 0x7000_0000);
        write_dump(&dir.join("b"), BASE_B, 0x7100_0000);
        session.add_dump(dir.join("a"), Address::new(BASE_A)).unwrap();
        session.add_dump(dir.join("b"), Address::new(BASE_B)).unwrap();
        session
    }

    #[test]
    fn test_parse_base_address() {
        assert_eq!(parse_base_address("0x140000000").unwrap(), Address::new(0x1_4000_0000));
        assert_eq!(parse_base_address(" 7ff6`12340000 ").unwrap(), Address::new(0x7ff6_1234_0000));
        assert!(matches!(parse_base_address("zz"), Err(DumpError::InvalidBaseAddress(_))));
        assert!(parse_base_address("0").is_err());
    }

    #[test]
    fn test_scan_needs_two_dumps() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(&dir.path().join("a"), BASE_A, 0x7000_0000);
        let mut session = Session::new(Config::default());
        session.add_dump(dir.path().join("a"), Address::new(BASE_A)).unwrap();
        assert!(matches!(session.scan(|_| {}), Err(ClassifyError::NotEnoughModules(1))));
    }

    #[test]
    fn test_failed_load_adds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(Config::default());
        assert!(session.add_dump(dir.path().join("missing"), Address::new(BASE_A)).is_err());
        assert_eq!(session.module_count(), 0);
    }

    #[test]
    fn test_run_writes_records_and_image() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());

        let report = session.run(|_| {}).unwrap();
        assert_eq!(report.results.relocations().len(), 1);
        assert_eq!(report.results.imports().len(), 2);
        assert_eq!(report.results.rebuild_data().import_runs().len(), 1);

        let records = RecordsSerializer::new().read_file(&report.records_path).unwrap();
        assert_eq!(records.relocations.len(), 1);
        assert_eq!(records.relocations[0].rva, 0x1abc);
        assert_eq!(records.imports[0].export, "Sleep");
        assert_eq!(records.imports[1].export, "GetProcAddress");

        let image = report.image.unwrap();
        assert_eq!(image.relocation_range, 0x2000..0x3000);
        assert_eq!(image.import_range, Some(0x3000..0x4000));
        assert!(!image.headers_patched);
        assert_eq!(fs::read(&image.path).unwrap().len(), 0x4000);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path());
        let parallel = session.scan(|_| {}).unwrap();

        session.config = session.config.clone().with_parallel(false);
        let sequential = session.scan(|_| {}).unwrap();
        assert_eq!(parallel.relocations(), sequential.relocations());
        assert_eq!(parallel.imports(), sequential.imports());
    }
}
