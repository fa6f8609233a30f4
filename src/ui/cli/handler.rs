// Thu Jan 22 2026 - Alex

use super::args::{parse_pointer_width, Args, Command, InteractiveArgs, PatchArgs, RebuildArgs};
use crate::config::Config;
use crate::memory::ExportMap;
use crate::output::RecordsSerializer;
use crate::patch::{ExportMapResolver, ImagePatcher};
use crate::session::{parse_base_address, Session, SessionReport};
use crate::ui::banner::Banner;
use crate::ui::progress::ProgressManager;
use crate::ui::terminal::TerminalInput;
use crate::ui::{print_info, print_success, print_warning};
use crate::utils::{format_bytes, format_duration, pluralize};
use anyhow::Context;
use colored::Colorize;
use std::fs;
use std::io::{BufRead, Write};
use std::time::Instant;

pub struct CommandHandler;

impl CommandHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, args: Args) -> anyhow::Result<()> {
        if args.no_color {
            colored::control::set_override(false);
        }

        if !args.quiet {
            Banner::default().with_color(!args.no_color).print();
        }

        self.setup_logging(&args)?;

        match args.command {
            Command::Rebuild(rebuild_args) => self.handle_rebuild(rebuild_args, args.quiet),
            Command::Interactive(interactive_args) => self.handle_interactive(interactive_args, args.quiet),
            Command::Patch(patch_args) => self.handle_patch(patch_args),
        }
    }

    fn setup_logging(&self, args: &Args) -> anyhow::Result<()> {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        };

        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .init();

        Ok(())
    }

    fn handle_rebuild(&self, args: RebuildArgs, quiet: bool) -> anyhow::Result<()> {
        args.validate().map_err(|e| anyhow::anyhow!(e))?;

        let mut session = Session::new(args.scan.to_config()?);
        for (folder, base) in args.dumps.iter().zip(&args.bases) {
            let base = parse_base_address(base)?;
            print_info(&format!("Loading dump {} at {}", folder.display(), base));
            session.add_dump(folder, base)?;
        }

        self.run_session(&session, quiet)
    }

    fn handle_interactive(&self, args: InteractiveArgs, quiet: bool) -> anyhow::Result<()> {
        let config = args.scan.to_config()?;
        let mut input = TerminalInput::stdio();
        let session = self.collect_dumps(config, &mut input)?;
        self.run_session(&session, quiet)
    }

    /// Prompts for dump folders and bases until at least two dumps are
    /// loaded and the operator declines another one.
    pub fn collect_dumps<R: BufRead, W: Write>(
        &self,
        config: Config,
        input: &mut TerminalInput<R, W>,
    ) -> anyhow::Result<Session> {
        let mut session = Session::new(config);

        loop {
            if session.module_count() >= 2 && !input.prompt_yes_no("Add additional dump? (y/n) ")? {
                break;
            }

            let folder = input.prompt(&format!("Enter folder path for dump {} to load: ", session.module_count() + 1))?;
            let base = match parse_base_address(&input.prompt("Enter module base/load address (BASE 16): ")?) {
                Ok(base) => base,
                Err(e) => {
                    print_warning(&e.to_string());
                    continue;
                }
            };

            match session.add_dump(&folder, base) {
                Ok(module) => print_success(&format!(
                    "Loaded {} ({})",
                    module.label(),
                    format_bytes(module.image_size() as u64)
                )),
                Err(e) => print_warning(&format!("Failed to load dump: {}", e)),
            }
        }

        Ok(session)
    }

    fn run_session(&self, session: &Session, quiet: bool) -> anyhow::Result<()> {
        let scan_size = session
            .modules()
            .iter()
            .map(|m| m.image_size())
            .min()
            .unwrap_or(0);

        let progress = if quiet {
            ProgressManager::hidden()
        } else {
            ProgressManager::new()
        };
        let bar = progress.create_scan_progress(scan_size as u64, "Scanning");

        let start = Instant::now();
        let report = session.run(|offset| bar.set_position(offset as u64))?;
        bar.finish_with_message("Complete!");

        if !quiet {
            self.print_summary(&report);
        }
        print_success(&format!("Finished in {}", format_duration(start.elapsed())));
        Ok(())
    }

    fn print_summary(&self, report: &SessionReport) {
        let results = &report.results;
        let data = results.rebuild_data();

        println!();
        println!("{}", "Results Summary".cyan().bold());
        println!("{}", "-".repeat(40).cyan());
        println!("  Relocations: {}", results.relocations().len().to_string().green());
        println!(
            "  Imports: {} ({} relative)",
            results.imports().len().to_string().green(),
            results.relative_import_count()
        );
        println!("  Memory references: {}", results.memory_references().len().to_string().green());
        println!(
            "  Relocation blocks: {}",
            pluralize(data.relocation_pages().len(), "page", "pages")
        );
        println!("  Import runs: {}", data.import_runs().len());
        for run in data.import_runs() {
            println!(
                "    {} at {:#x}: {}",
                run.module_name().cyan(),
                run.start_offset(),
                pluralize(run.len(), "thunk", "thunks")
            );
        }
        println!();

        print_success(&format!("Records written to {}", report.records_path.display()));
        match &report.image {
            Some(image) => {
                print_success(&format!(
                    "Image written to {} ({})",
                    image.path.display(),
                    format_bytes(image.size as u64)
                ));
                print_info(&format!(
                    ".reloc at {:#x}..{:#x}",
                    image.relocation_range.start, image.relocation_range.end
                ));
                match &image.import_range {
                    Some(range) => print_info(&format!(".idata at {:#x}..{:#x}", range.start, range.end)),
                    None => print_info("No import section, no absolute imports found"),
                }
                if !image.headers_patched {
                    print_warning("PE headers were not updated");
                }
            }
            None => print_warning("No image written"),
        }
    }

    fn handle_patch(&self, args: PatchArgs) -> anyhow::Result<()> {
        let width = parse_pointer_width(args.pointer_width)?;
        let base = parse_base_address(&args.base)?;

        let mut image = fs::read(&args.image)
            .with_context(|| format!("Failed to read {}", args.image.display()))?;
        let records = RecordsSerializer::new().read_file(&args.records)?;
        let resolver = ExportMapResolver::new(ExportMap::load(&args.exports)?);

        print_info(&format!(
            "Applying {} to {}",
            pluralize(records.total_count(), "record", "records"),
            args.image.display()
        ));

        let stats = ImagePatcher::new(&resolver, width, base).apply(&mut image, &records)?;

        fs::write(&args.output, &image)
            .with_context(|| format!("Failed to write {}", args.output.display()))?;
        print_success(&format!("Patched {} into {}", stats, args.output.display()));
        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::PointerWidth;
    use std::path::Path;

    fn write_dump(dir: &Path, base: u64) {
        fs::create_dir_all(dir).unwrap();
        let mut image = vec![0u8; 0x1000];
        PointerWidth::Bits64.write(&mut image, 0x100, base + 0x20);
        fs::write(dir.join("mem.bin"), &image).unwrap();
        fs::write(dir.join("exports.txt"), "{}").unwrap();
    }

    #[test]
    fn test_collect_dumps_prompts_until_declined() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        write_dump(&a, 0x1000_0000);
        write_dump(&b, 0x2000_0000);

        let script = format!(
            "{}\n10000000\n{}\nnot-hex\n{}\n10000000\n{}\n0x20000000\nwhat\nn\n",
            dir.path().join("missing").display(),
            a.display(),
            a.display(),
            b.display()
        );
        let mut input = TerminalInput::new(script.as_bytes(), Vec::new());

        let session = CommandHandler::new().collect_dumps(Config::default(), &mut input).unwrap();
        assert_eq!(session.module_count(), 2);
        assert_eq!(session.modules()[1].base_address().as_u64(), 0x2000_0000);

        let transcript = String::from_utf8(input.writer().clone()).unwrap();
        assert!(transcript.contains("Enter folder path for dump 1 to load: "));
        assert!(transcript.contains("Enter folder path for dump 2 to load: "));
        assert!(!transcript.contains("dump 0"));
        assert_eq!(transcript.matches("Add additional dump? (y/n) ").count(), 2);
    }

    #[test]
    fn test_collect_dumps_eof_is_error() {
        let mut input = TerminalInput::new(&b""[..], Vec::new());
        assert!(CommandHandler::new().collect_dumps(Config::default(), &mut input).is_err());
    }
}
