// Wed Jan 21 2026 - Alex

use crate::output::{RecordsError, RecordsFile};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const DEFAULT_RECORDS_NAME: &str = "reloc_info.txt";

/// Reads and writes records files: pretty JSON, keys in alphabetical order.
pub struct RecordsSerializer {
    indent: Vec<u8>,
}

impl Default for RecordsSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordsSerializer {
    pub fn new() -> Self {
        Self {
            indent: b"\t".to_vec(),
        }
    }

    pub fn serialize(&self, records: &RecordsFile) -> Result<String, RecordsError> {
        let mut buf = Vec::new();
        self.write_to(records, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn write_to<W: Write>(&self, records: &RecordsFile, writer: W) -> Result<(), RecordsError> {
        let formatter = PrettyFormatter::with_indent(&self.indent);
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        records.serialize(&mut serializer)?;
        Ok(())
    }

    pub fn write_file<P: AsRef<Path>>(&self, records: &RecordsFile, path: P) -> Result<(), RecordsError> {
        let path = path.as_ref();
        let io_err = |source| RecordsError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        self.write_to(records, &mut writer)?;
        writer.flush().map_err(io_err)?;

        log::info!("Results written to {}", path.display());
        Ok(())
    }

    pub fn parse(&self, contents: &str) -> Result<RecordsFile, RecordsError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Result<RecordsFile, RecordsError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| RecordsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&contents)
    }
}
