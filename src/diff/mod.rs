// Tue Jan 20 2026 - Alex

pub mod classifier;
pub mod rebuild;
pub mod records;
pub mod results;
pub mod shard;

pub use classifier::{ClassifyError, DifferentialClassifier, CALL_REL, JMP_REL};
pub use rebuild::{ImportRun, RebuildData, PAGE_SIZE};
pub use records::{DirectMemoryReference, Finding, ImportReference, RelocationRecord};
pub use results::ScanResults;
pub use shard::DEFAULT_SHARD_SIZE;
