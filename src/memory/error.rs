// Mon Jan 19 2026 - Alex

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Dump {path} is truncated: expected {expected} bytes, read {read}")]
    Truncated {
        path: PathBuf,
        expected: u64,
        read: usize,
    },
    #[error("Dump {0} is empty")]
    EmptyImage(PathBuf),
    #[error("Failed parsing export map: {0}")]
    ExportMapParse(String),
    #[error("Invalid base address: {0}")]
    InvalidBaseAddress(String),
    #[error("Module {module} overflows the address space (base {base:#x}, size {size:#x})")]
    RangeOverflow {
        module: String,
        base: u64,
        size: u64,
    },
}

impl DumpError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
