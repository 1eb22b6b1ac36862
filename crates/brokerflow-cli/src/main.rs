mod cli;
mod commands;
mod error;
mod output;

use brokerflow_core::FlowConfig;
use clap::Parser;
use env_logger::{Builder, Env, Target};

use crate::cli::Cli;
use crate::error::CliError;

fn main() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = FlowConfig::resolve(cli.config.as_deref())?;

    let result = commands::run(&cli, &config)?;
    output::render(&result, cli.pretty)?;

    if cli.strict && !result.warnings.is_empty() {
        return Err(CliError::StrictModeViolation {
            skipped_count: result.warnings.len(),
        });
    }

    Ok(())
}
