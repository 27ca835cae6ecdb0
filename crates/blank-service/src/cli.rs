//! Command-line flags.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "blank-service")]
#[command(about = "Blank service - status endpoint with graceful shutdown")]
#[command(version)]
pub struct Cli {
    /// Verbose mode (debug logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (default: search /etc/blank, ~/.blank, .)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
