// Thu Jan 22 2026 - Alex

use crate::memory::{PointerWidth, DEFAULT_EXPORTS_NAME, DEFAULT_IMAGE_NAME};
use crate::output::DEFAULT_RECORDS_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pointer_width: PointerWidth,
    pub stride: usize,
    pub dump_image_name: String,
    pub exports_name: String,
    pub output_image: PathBuf,
    pub records_file: PathBuf,
    pub parallel: bool,
    pub threads: usize,
    pub patch_headers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pointer_width: PointerWidth::Bits64,
            stride: 1,
            dump_image_name: DEFAULT_IMAGE_NAME.to_string(),
            exports_name: DEFAULT_EXPORTS_NAME.to_string(),
            output_image: PathBuf::from("relocated.dll"),
            records_file: PathBuf::from(DEFAULT_RECORDS_NAME),
            parallel: true,
            threads: num_cpus::get(),
            patch_headers: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON config. Missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_pointer_width(mut self, width: PointerWidth) -> Self {
        self.pointer_width = width;
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_output_image(mut self, path: PathBuf) -> Self {
        self.output_image = path;
        self
    }

    pub fn with_records_file(mut self, path: PathBuf) -> Self {
        self.records_file = path;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_header_patch(mut self, enabled: bool) -> Self {
        self.patch_headers = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stride == 0 {
            return Err(ConfigError::Invalid("stride must be greater than 0".to_string()));
        }
        if self.parallel && self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be greater than 0".to_string()));
        }
        if self.dump_image_name.is_empty() || self.exports_name.is_empty() {
            return Err(ConfigError::Invalid("dump file names must not be empty".to_string()));
        }
        Ok(())
    }
}
