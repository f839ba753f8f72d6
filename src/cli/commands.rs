//! CLI arguments

use clap::Parser;
use std::path::PathBuf;

/// Singer tap for the Insightly CRM API
#[derive(Parser, Debug)]
#[command(name = "tap-insightly")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON, or YAML for .yaml/.yml)
    #[arg(short, long)]
    pub config: PathBuf,

    /// State file from a previous run (JSON)
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Catalog file with stream selection (JSON)
    #[arg(long, visible_alias = "properties")]
    pub catalog: Option<PathBuf>,

    /// Print the discovered catalog and exit
    #[arg(short, long)]
    pub discover: bool,

    /// Also write committed state to this file
    #[arg(long)]
    pub state_output: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}
