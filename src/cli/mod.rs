//! CLI module
//!
//! Command-line interface for the tap.
//!
//! # Modes
//!
//! - `--discover` - Print the catalog of available streams
//! - default - Sync the selected streams, writing Singer messages to stdout

mod commands;
mod runner;

pub use commands::Cli;
pub use runner::Runner;
