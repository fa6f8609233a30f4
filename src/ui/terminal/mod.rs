// Thu Jan 22 2026 - Alex

pub mod input;

pub use input::TerminalInput;
