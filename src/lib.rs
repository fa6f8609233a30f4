// Tue Jan 20 2026 - Alex

pub mod config;
pub mod diff;
pub mod memory;
pub mod output;
pub mod patch;
pub mod section;
pub mod session;
pub mod ui;
pub mod utils;

pub use config::Config;
pub use diff::{DifferentialClassifier, ScanResults};
pub use memory::{Address, ExportMap, LoadedModule, PointerWidth};
pub use output::{RecordsFile, RecordsSerializer};
pub use patch::{ExportMapResolver, ImagePatcher, SymbolResolver};
pub use section::{ImageAssembler, ImportSectionBuilder, RelocationSectionBuilder, RebuiltImage};
pub use session::{Session, SessionError, SessionReport};
