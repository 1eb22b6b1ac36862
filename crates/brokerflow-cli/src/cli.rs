//! CLI argument definitions for brokerflow.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `generate` | Analyze every instrument under a base directory and write the report |
//! | `scan` | List the snapshot files of one instrument with their derived dates |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat skipped instruments as failures |
//! | `--config` | none | Broker configuration file (falls back to `BROKERFLOW_CONFIG`) |
//!
//! # Examples
//!
//! ```bash
//! # Full batch to a file
//! brokerflow generate --base data/ --output dashboard.json --pretty
//!
//! # Two instruments only
//! brokerflow generate --base data/ --instrument BBCA --instrument TLKM
//!
//! # Inspect how files map to dates
//! brokerflow scan --base data/ --instrument BBCA
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "brokerflow",
    author,
    version,
    about = "Daily broker flow reconstruction and scoring",
    long_about = "brokerflow reads cumulative broker-summary snapshots, rebuilds the daily \
flow of each broker, splits it into institutional and retail cohorts and scores the result.\n\
\n\
Use 'brokerflow <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Exit with code 5 when any instrument was skipped.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Broker configuration file (JSON).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline for every instrument and emit the report.
    Generate(GenerateArgs),
    /// Show the snapshot files discovered for one instrument.
    Scan(ScanArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Directory holding one folder per instrument.
    #[arg(long, value_name = "DIR")]
    pub base: PathBuf,

    /// Write the report here instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Restrict the run to these instrument codes (repeatable).
    #[arg(long = "instrument", value_name = "CODE")]
    pub instruments: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory holding one folder per instrument.
    #[arg(long, value_name = "DIR")]
    pub base: PathBuf,

    /// Instrument code (case-insensitive).
    #[arg(long, value_name = "CODE")]
    pub instrument: String,
}
