use brokerflow_core::{run_batch, FlowConfig, SkippedInstrument};

use crate::cli::GenerateArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &GenerateArgs, config: &FlowConfig) -> Result<CommandResult, CliError> {
    let outcome = run_batch(&args.base, &args.instruments, config)?;

    if outcome.report.stocks.is_empty() {
        log::warn!("no instruments produced a report under {}", args.base.display());
    }

    let warnings = outcome.skipped.iter().map(describe_skip).collect();
    let data = serde_json::to_value(&outcome.report)?;

    Ok(CommandResult::ok(data)
        .with_warnings(warnings)
        .with_destination(args.output.clone()))
}

fn describe_skip(skipped: &SkippedInstrument) -> String {
    format!("{}: {}", skipped.code, skipped.reason)
}
