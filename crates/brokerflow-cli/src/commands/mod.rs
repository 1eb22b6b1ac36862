mod generate;
mod scan;

use std::path::PathBuf;

use brokerflow_core::FlowConfig;
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    /// File the payload goes to; stdout when `None`.
    pub destination: Option<PathBuf>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            destination: None,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }
}

pub fn run(cli: &Cli, config: &FlowConfig) -> Result<CommandResult, CliError> {
    match &cli.command {
        Command::Generate(args) => generate::run(args, config),
        Command::Scan(args) => scan::run(args),
    }
}
