use std::fs;

use crate::commands::CommandResult;
use crate::error::CliError;

pub fn render(result: &CommandResult, pretty: bool) -> Result<(), CliError> {
    for warning in &result.warnings {
        log::warn!("{warning}");
    }

    let payload = to_json(result, pretty)?;
    match &result.destination {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, payload)?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{payload}"),
    }

    Ok(())
}

fn to_json(result: &CommandResult, pretty: bool) -> Result<String, CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(&result.data)?
    } else {
        serde_json::to_string(&result.data)?
    };
    Ok(payload)
}
