//! Parser for one tab-delimited broker summary export.
//!
//! Each export holds year-to-date cumulative figures per broker. Row 0 carries
//! the reporting period (`Start <date> End <date>`); broker rows begin at
//! row 3. Malformed content never fails the parse: bad rows are dropped and
//! bad numeric cells read as zero.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::TradingDate;

const DATA_START_ROW: usize = 3;
const MIN_FIELDS: usize = 9;
const MAX_CODE_LEN: usize = 3;
const NON_BROKER_TOKENS: [&str; 2] = ["BY", "BOARD"];
/// Raw currency units per reported unit (values are reported in billions).
const VALUE_SCALE: f64 = 1_000_000_000.0;

const COL_CODE: usize = 0;
const COL_BUY_LOT: usize = 1;
const COL_BUY_VALUE: usize = 2;
const COL_BUY_AVG: usize = 3;
const COL_SELL_LOT: usize = 6;
const COL_SELL_VALUE: usize = 7;
const COL_SELL_AVG: usize = 8;

/// Cumulative position of one broker in one export.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrokerPosition {
    /// Cumulative buy value, in billions.
    pub buy_value: f64,
    /// Cumulative sell value, in billions.
    pub sell_value: f64,
    pub buy_avg: f64,
    pub sell_avg: f64,
    pub buy_lots: f64,
    pub sell_lots: f64,
}

impl BrokerPosition {
    fn from_fields(fields: &[&str]) -> Self {
        let cell = |index: usize| fields.get(index).map_or(0.0, |raw| parse_number(raw));
        Self {
            buy_value: cell(COL_BUY_VALUE) / VALUE_SCALE,
            sell_value: cell(COL_SELL_VALUE) / VALUE_SCALE,
            buy_avg: cell(COL_BUY_AVG),
            sell_avg: cell(COL_SELL_AVG),
            buy_lots: cell(COL_BUY_LOT),
            sell_lots: cell(COL_SELL_LOT),
        }
    }
}

/// Parsed content of one export file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub brokers: BTreeMap<String, BrokerPosition>,
}

impl Snapshot {
    pub fn parse(content: &str) -> Self {
        Self::from_lines(content.trim_start_matches('\u{feff}').lines())
    }

    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut snapshot = Self::default();

        for (index, line) in lines.into_iter().enumerate() {
            if index == 0 {
                let (start, end) = parse_header(line);
                snapshot.period_start = start;
                snapshot.period_end = end;
                continue;
            }
            if index < DATA_START_ROW {
                continue;
            }
            if let Some((code, position)) = parse_row(line) {
                snapshot.brokers.insert(code, position);
            }
        }

        snapshot
    }

    /// Reads and parses a file. Unreadable files yield an empty snapshot.
    pub fn read(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(error) => {
                log::warn!("failed to read snapshot {}: {error}", path.display());
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.brokers.is_empty()
    }

    pub fn position(&self, code: &str) -> Option<&BrokerPosition> {
        self.brokers.get(code)
    }
}

/// A snapshot together with the calendar date derived from where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedSnapshot {
    pub date: Option<TradingDate>,
    pub source: PathBuf,
    pub snapshot: Snapshot,
}

impl DatedSnapshot {
    pub fn new(date: Option<TradingDate>, source: impl Into<PathBuf>, snapshot: Snapshot) -> Self {
        Self {
            date,
            source: source.into(),
            snapshot,
        }
    }
}

/// Extracts the tokens following `Start` and `End` in a header line.
pub fn parse_header(line: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = line.trim().split('\t').map(str::trim).collect();
    let mut start = None;
    let mut end = None;

    for pair in parts.windows(2) {
        let value = Some(pair[1]).filter(|value| !value.is_empty());
        match pair[0] {
            "Start" => start = value.map(str::to_owned),
            "End" => end = value.map(str::to_owned),
            _ => {}
        }
    }

    (start, end)
}

fn parse_row(line: &str) -> Option<(String, BrokerPosition)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || !line.contains('\t') {
        return None;
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let code = fields[COL_CODE].trim().to_ascii_uppercase();
    if code.is_empty() || code.len() > MAX_CODE_LEN || NON_BROKER_TOKENS.contains(&code.as_str()) {
        return None;
    }

    Some((code, BrokerPosition::from_fields(&fields)))
}

/// Parses a numeric cell, dropping thousands separators. Anything unreadable is zero.
fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(rows: &[&str]) -> String {
        let mut lines = vec![
            "Broker Summary\tStart\t2025-01-02\tEnd\t2025-01-06".to_owned(),
            "BY\tB.lot\tB.val\tB.avg\t\t\tS.lot\tS.val\tS.avg".to_owned(),
            "Board\tRG".to_owned(),
        ];
        lines.extend(rows.iter().map(|row| (*row).to_owned()));
        lines.join("\n")
    }

    #[test]
    fn parses_header_dates() {
        let (start, end) = parse_header("Summary\tStart\t2025-01-02\tEnd\t2025-01-06\r\n");
        assert_eq!(start.as_deref(), Some("2025-01-02"));
        assert_eq!(end.as_deref(), Some("2025-01-06"));
    }

    #[test]
    fn missing_header_tokens_yield_absent_dates() {
        assert_eq!(parse_header("garbage line"), (None, None));
        assert_eq!(parse_header("Start"), (None, None));
        assert_eq!(parse_header("End\t2025-01-06"), (None, Some("2025-01-06".to_owned())));
    }

    #[test]
    fn parses_broker_rows_with_thousands_separators() {
        let content = export(&[
            "ak\t1,200\t12,500,000,000\t1,040\t\t\t300\t3,000,000,000\t1,050",
        ]);
        let snapshot = Snapshot::parse(&content);

        let position = snapshot.position("AK").expect("AK row");
        assert_eq!(position.buy_lots, 1_200.0);
        assert_eq!(position.buy_value, 12.5);
        assert_eq!(position.buy_avg, 1_040.0);
        assert_eq!(position.sell_lots, 300.0);
        assert_eq!(position.sell_value, 3.0);
        assert_eq!(position.sell_avg, 1_050.0);
        assert_eq!(snapshot.period_start.as_deref(), Some("2025-01-02"));
    }

    #[test]
    fn skips_rows_that_are_not_broker_rows() {
        let content = export(&[
            "",
            "no tabs here",
            "CC\t1\t2\t3",
            "BY\t1\t1\t1\t\t\t1\t1\t1",
            "board\t1\t1\t1\t\t\t1\t1\t1",
            "TOTAL\t1\t1\t1\t\t\t1\t1\t1",
            "\t1\t1\t1\t\t\t1\t1\t1",
            "XL\t10\t1000000000\t100\t\t\t0\t0\t0",
        ]);
        let snapshot = Snapshot::parse(&content);

        assert_eq!(snapshot.brokers.len(), 1);
        assert!(snapshot.position("XL").is_some());
    }

    #[test]
    fn malformed_cells_default_to_zero_without_dropping_row() {
        let content = export(&["CC\tabc\t2000000000\tn/a\t\t\t5\tNaN\t101"]);
        let snapshot = Snapshot::parse(&content);

        let position = snapshot.position("CC").expect("CC row");
        assert_eq!(position.buy_lots, 0.0);
        assert_eq!(position.buy_value, 2.0);
        assert_eq!(position.buy_avg, 0.0);
        assert_eq!(position.sell_lots, 5.0);
        assert_eq!(position.sell_value, 0.0);
        assert_eq!(position.sell_avg, 101.0);
    }

    #[test]
    fn later_row_for_same_code_wins() {
        let content = export(&[
            "CC\t1\t1000000000\t100\t\t\t0\t0\t0",
            "CC\t2\t4000000000\t200\t\t\t0\t0\t0",
        ]);
        let snapshot = Snapshot::parse(&content);
        assert_eq!(snapshot.position("CC").map(|p| p.buy_lots), Some(2.0));
    }

    #[test]
    fn rows_before_data_offset_are_ignored() {
        let content = "Start\t2025-01-02\nCC\t1\t1\t1\t\t\t1\t1\t1\nCC\t1\t1\t1\t\t\t1\t1\t1\n";
        assert!(Snapshot::parse(content).is_empty());
    }

    #[test]
    fn unreadable_file_yields_empty_snapshot() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("01.csv");
        fs::write(&path, [0xff_u8, 0xfe, 0x00, 0x41]).expect("write bytes");

        assert_eq!(Snapshot::read(&path), Snapshot::default());
        assert_eq!(Snapshot::read(&temp.path().join("missing.csv")), Snapshot::default());
    }
}
