// Tue Jan 20 2026 - Alex

use dump_reloc_rebuilder::ui::{cli, print_error};

fn main() {
    if let Err(e) = cli::run() {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
