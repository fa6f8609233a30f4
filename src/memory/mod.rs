// Mon Jan 19 2026 - Alex

pub mod address;
pub mod error;
pub mod exports;
pub mod module;
pub mod range;
pub mod width;

pub use address::Address;
pub use error::DumpError;
pub use exports::{ExportInfo, ExportMap, MappedModule};
pub use module::{DirectReference, LoadedModule, DEFAULT_EXPORTS_NAME, DEFAULT_IMAGE_NAME};
pub use range::MemoryRange;
pub use width::PointerWidth;
