//! CLI layer for tablekit.
//!
//! Provides the command-line interface using clap, with commands for
//! inspecting an existing store: its version, tables, schema, and rows.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
