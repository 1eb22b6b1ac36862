use std::collections::BTreeMap;
use std::path::PathBuf;

use brokerflow_core::{list_instruments, scan_instrument, CoreError, SnapshotFile};
use serde::Serialize;

use crate::cli::ScanArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ScanResponseData {
    code: String,
    path: PathBuf,
    files: Vec<SnapshotFile>,
    undated: usize,
    /// Snapshot count per month folder.
    folders: BTreeMap<String, usize>,
}

pub fn run(args: &ScanArgs) -> Result<CommandResult, CliError> {
    let instrument = list_instruments(&args.base)
        .map_err(CoreError::from)?
        .into_iter()
        .find(|instrument| instrument.code.eq_ignore_ascii_case(&args.instrument))
        .ok_or_else(|| {
            CliError::Command(format!(
                "instrument '{}' not found under {}",
                args.instrument,
                args.base.display()
            ))
        })?;

    let files = scan_instrument(&instrument.path).map_err(CoreError::from)?;

    let mut folders = BTreeMap::new();
    for file in &files {
        let folder = file
            .path
            .parent()
            .and_then(|parent| parent.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        *folders.entry(folder).or_insert(0) += 1;
    }

    let undated = files.iter().filter(|file| file.date.is_none()).count();
    let warnings = if files.is_empty() {
        vec![format!("{}: no snapshot files", instrument.code)]
    } else {
        Vec::new()
    };

    let data = serde_json::to_value(ScanResponseData {
        code: instrument.code,
        path: instrument.path,
        files,
        undated,
        folders,
    })?;

    Ok(CommandResult::ok(data).with_warnings(warnings))
}
