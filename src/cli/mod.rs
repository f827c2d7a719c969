//! Command-line interface.
//!
//! Argument parsing and the text/JSON rendering of run results.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
