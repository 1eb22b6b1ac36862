//! Locates instrument folders and their snapshot files.
//!
//! Layout: `<base>/<CODE>/<MONYY>/<DD>.csv`. The month comes from a
//! three-letter token in the parent folder name, the year from the folder's
//! trailing digits, and the day from the file stem.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::reconstruct::order_by_date;
use crate::{DiscoveryError, TradingDate};

const SNAPSHOT_EXTENSION: &str = "csv";

/// Month tokens checked in order; the first one found in the folder name wins.
const MONTH_TOKENS: [(&str, u8); 13] = [
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
    ("DES", 12),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentDir {
    pub code: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotFile {
    pub path: PathBuf,
    /// `None` when the folder or file name does not yield a calendar date.
    pub date: Option<TradingDate>,
}

/// Immediate subdirectories of `base`, sorted by name.
pub fn list_instruments(base: &Path) -> Result<Vec<InstrumentDir>, DiscoveryError> {
    if !base.exists() {
        return Err(DiscoveryError::MissingBaseDir {
            path: base.to_path_buf(),
        });
    }
    if !base.is_dir() {
        return Err(DiscoveryError::NotADirectory {
            path: base.to_path_buf(),
        });
    }

    let mut instruments = Vec::new();
    for entry in fs::read_dir(base)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(code) = path.file_name().map(|name| name.to_string_lossy().into_owned()) else {
            continue;
        };
        instruments.push(InstrumentDir { code, path });
    }

    instruments.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(instruments)
}

/// Snapshot files of one instrument in processing order.
///
/// Dated files come first in date order, undated files follow in path order.
/// When two files map to the same date the first in path order is kept.
pub fn scan_instrument(dir: &Path) -> Result<Vec<SnapshotFile>, DiscoveryError> {
    let mut paths = Vec::new();
    collect_snapshot_paths(dir, &mut paths)?;
    paths.sort();

    let mut files: Vec<SnapshotFile> = paths
        .into_iter()
        .filter_map(|path| {
            let Some(day) = day_from_stem(&path) else {
                log::debug!("skipping {}: file name is not a day number", path.display());
                return None;
            };
            let date = parent_folder_name(&path).and_then(|folder| folder_date(&folder, day));
            Some(SnapshotFile { path, date })
        })
        .collect();
    order_by_date(&mut files, |file| file.date);

    let mut seen = BTreeSet::new();
    files.retain(|file| match file.date {
        Some(date) if !seen.insert(date) => {
            log::warn!(
                "skipping {}: another snapshot already covers {date}",
                file.path.display()
            );
            false
        }
        _ => true,
    });

    Ok(files)
}

/// Month number from the first month token contained in `folder`, case-insensitive.
pub fn month_from_folder(folder: &str) -> Option<u8> {
    let upper = folder.to_ascii_uppercase();
    MONTH_TOKENS
        .iter()
        .find(|(token, _)| upper.contains(token))
        .map(|(_, month)| *month)
}

/// Year from the folder's trailing digits: two digits mean 20xx, four are taken as is.
pub fn year_from_folder(folder: &str) -> Option<i32> {
    let digits: String = folder
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let suffix = &digits[digits.len().saturating_sub(4)..];

    match suffix.len() {
        2 => suffix.parse::<i32>().ok().map(|year| 2000 + year),
        4 => suffix.parse::<i32>().ok(),
        _ => None,
    }
}

/// Calendar date for day `day` of the month/year encoded in `folder`.
pub fn folder_date(folder: &str, day: u8) -> Option<TradingDate> {
    let month = month_from_folder(folder)?;
    let year = year_from_folder(folder)?;
    TradingDate::from_calendar(year, month, day).ok()
}

fn day_from_stem(path: &Path) -> Option<u8> {
    path.file_stem()?.to_str()?.trim().parse::<u8>().ok()
}

fn parent_folder_name(path: &Path) -> Option<String> {
    path.parent()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn collect_snapshot_paths(root: &Path, files: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_snapshot_paths(&path, files)?;
            continue;
        }
        if path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case(SNAPSHOT_EXTENSION))
        {
            files.push(path);
        }
    }
    Ok(())
}
