// Thu Jan 22 2026 - Alex

use crate::config::Config;
use crate::memory::PointerWidth;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dump-reloc-rebuilder")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Rebuilds .reloc and import sections from memory dumps", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Diff dumps given on the command line
    Rebuild(RebuildArgs),
    /// Prompt for dump folders and bases
    Interactive(InteractiveArgs),
    /// Apply a records file to a raw image
    Patch(PatchArgs),
}

/// Options shared by every command that runs a scan.
#[derive(Parser, Debug, Clone)]
pub struct ScanOptions {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long)]
    pub records: Option<PathBuf>,

    #[arg(long)]
    pub pointer_width: Option<u32>,

    #[arg(long)]
    pub stride: Option<usize>,

    #[arg(long)]
    pub threads: Option<usize>,

    #[arg(long)]
    pub no_parallel: bool,

    #[arg(long)]
    pub no_header_patch: bool,
}

impl ScanOptions {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(output) = &self.output {
            config = config.with_output_image(output.clone());
        }
        if let Some(records) = &self.records {
            config = config.with_records_file(records.clone());
        }
        if let Some(bits) = self.pointer_width {
            config = config.with_pointer_width(parse_pointer_width(bits)?);
        }
        if let Some(stride) = self.stride {
            config = config.with_stride(stride);
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if self.no_parallel {
            config = config.with_parallel(false);
        }
        if self.no_header_patch {
            config = config.with_header_patch(false);
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Parser, Debug)]
pub struct RebuildArgs {
    /// Dump folder, once per dump; dump 0 is the reference
    #[arg(short, long = "dump", required = true, num_args = 1)]
    pub dumps: Vec<PathBuf>,

    /// Base address of each dump in hex, same order as --dump
    #[arg(short, long = "base", required = true, num_args = 1)]
    pub bases: Vec<String>,

    #[command(flatten)]
    pub scan: ScanOptions,
}

impl RebuildArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.dumps.len() < 2 {
            return Err("At least two dumps are required".to_string());
        }
        if self.dumps.len() != self.bases.len() {
            return Err(format!(
                "Got {} dumps but {} base addresses",
                self.dumps.len(),
                self.bases.len()
            ));
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct InteractiveArgs {
    #[command(flatten)]
    pub scan: ScanOptions,
}

#[derive(Parser, Debug)]
pub struct PatchArgs {
    /// Raw image to patch, typically the rebuilt one
    #[arg(short, long)]
    pub image: PathBuf,

    #[arg(short, long)]
    pub records: PathBuf,

    /// Address the image will be mapped at, in hex
    #[arg(short, long)]
    pub base: String,

    /// Export map of the target process
    #[arg(short, long)]
    pub exports: PathBuf,

    #[arg(short, long, default_value = "patched.bin")]
    pub output: PathBuf,

    #[arg(long, default_value = "64")]
    pub pointer_width: u32,
}

pub fn parse_pointer_width(bits: u32) -> anyhow::Result<PointerWidth> {
    PointerWidth::from_bits(bits).ok_or_else(|| anyhow::anyhow!("Unsupported pointer width: {} bits", bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_args_parse() {
        let args = Args::parse_from([
            "dump-reloc-rebuilder",
            "rebuild",
            "-d",
            "a",
            "-b",
            "10000000",
            "--dump",
            "b",
            "--base",
            "0x20000000",
            "--pointer-width",
            "32",
            "--no-parallel",
        ]);

        let Command::Rebuild(rebuild) = args.command else {
            panic!("expected rebuild");
        };
        assert!(rebuild.validate().is_ok());
        assert_eq!(rebuild.dumps, vec![PathBuf::from("a"), PathBuf::from("b")]);

        let config = rebuild.scan.to_config().unwrap();
        assert_eq!(config.pointer_width, PointerWidth::Bits32);
        assert!(!config.parallel);
        assert!(config.patch_headers);
    }

    #[test]
    fn test_rebuild_args_mismatched_bases() {
        let args = Args::parse_from(["x", "rebuild", "-d", "a", "-d", "b", "-b", "1000"]);
        let Command::Rebuild(rebuild) = args.command else {
            panic!("expected rebuild");
        };
        assert!(rebuild.validate().is_err());
    }

    #[test]
    fn test_bad_pointer_width_rejected() {
        let options = ScanOptions {
            config: None,
            output: None,
            records: None,
            pointer_width: Some(16),
            stride: None,
            threads: None,
            no_parallel: false,
            no_header_patch: false,
        };
        assert!(options.to_config().is_err());
    }
}
