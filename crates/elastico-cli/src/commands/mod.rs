//! CLI command implementations.

pub mod common;
pub mod process;
pub mod settings;
pub mod simulate;
