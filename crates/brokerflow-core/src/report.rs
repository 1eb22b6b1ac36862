//! Per-instrument pipeline, the parallel batch runner and the output document.

use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::aggregate::{aggregate, BrokerRollup, DailyRecord, Summary};
use crate::confidence::{assess, ConfidenceInputs, ConfidenceResult};
use crate::discovery::{list_instruments, scan_instrument, InstrumentDir};
use crate::insights::{self, Insights};
use crate::signal::{self, SignalResult};
use crate::snapshot::{DatedSnapshot, Snapshot};
use crate::volatility::{self, VolatilityTrend};
use crate::zones::{self, PriceRecommendation};
use crate::{CoreError, DiscoveryError, FlowConfig, GeneratedAt, TradingDate};

const UNKNOWN: &str = "Unknown";

/// Full analysis of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockReport {
    pub code: String,
    pub date_start: String,
    pub date_end: String,
    pub summary: Summary,
    pub brokers: Vec<BrokerRollup>,
    pub daily: Vec<DailyRecord>,
    pub recommendation: SignalResult,
    #[serde(rename = "volatilityTrend")]
    pub volatility_trend: VolatilityTrend,
    #[serde(rename = "priceRecommendation")]
    pub price_recommendation: PriceRecommendation,
    pub confidence: ConfidenceResult,
    pub insights: Insights,
}

/// The document written by a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub generated_at: GeneratedAt,
    pub stocks: BTreeMap<String, StockReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedInstrument {
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub report: Report,
    pub skipped: Vec<SkippedInstrument>,
}

/// Runs every pipeline stage over an ordered snapshot series.
///
/// `date_end` is the last record's header `End`. When that header is missing
/// it falls back to the record's file date, so it can differ from the last
/// daily row, whose `date_end` stays `Unknown`.
pub fn analyze_instrument(
    code: &str,
    snapshots: &[DatedSnapshot],
    config: &FlowConfig,
) -> StockReport {
    let flow = aggregate(snapshots, config);
    let recommendation = signal::evaluate(&flow.summary, &flow.daily);
    let volatility_trend = volatility::analyze(&flow.daily);
    let price_recommendation = zones::calculate(&flow.daily, &volatility_trend, &recommendation);
    let confidence = assess(&ConfidenceInputs::from_pipeline(
        &flow.summary,
        &volatility_trend,
        &recommendation,
        &price_recommendation,
    ));
    let insights = insights::generate(&flow.summary, &flow.daily);

    let date_start = flow
        .daily
        .first()
        .and_then(|record| record.date)
        .map_or_else(|| UNKNOWN.to_owned(), TradingDate::format_iso);
    let date_end = flow
        .daily
        .last()
        .and_then(|record| {
            record
                .period_end
                .clone()
                .or_else(|| record.date.map(TradingDate::format_iso))
        })
        .unwrap_or_else(|| UNKNOWN.to_owned());

    StockReport {
        code: code.to_owned(),
        date_start,
        date_end,
        summary: flow.summary,
        brokers: flow.brokers,
        daily: flow.daily,
        recommendation,
        volatility_trend,
        price_recommendation,
        confidence,
        insights,
    }
}

/// Discovers and parses the snapshot files of one instrument, in processing order.
pub fn load_instrument(dir: &Path) -> Result<Vec<DatedSnapshot>, DiscoveryError> {
    let files = scan_instrument(dir)?;
    Ok(files
        .into_iter()
        .map(|file| {
            log::debug!("reading {}", file.path.display());
            let snapshot = Snapshot::read(&file.path);
            DatedSnapshot::new(file.date, file.path, snapshot)
        })
        .collect())
}

/// Loads and analyzes one instrument. `None` when the folder holds no snapshot files.
pub fn process_instrument(
    instrument: &InstrumentDir,
    config: &FlowConfig,
) -> Result<Option<StockReport>, CoreError> {
    let snapshots = load_instrument(&instrument.path)?;
    if snapshots.is_empty() {
        return Ok(None);
    }
    log::info!("{}: found {} snapshot files", instrument.code, snapshots.len());

    let report = analyze_instrument(&instrument.code, &snapshots, config);
    log::info!(
        "{}: date range {} to {}",
        report.code,
        report.date_start,
        report.date_end
    );
    log::info!(
        "{}: {} days, recommendation {}",
        report.code,
        report.daily.len(),
        report.recommendation.recommendation
    );
    Ok(Some(report))
}

/// Analyzes every instrument under `base` in parallel.
///
/// `only` restricts the run to the given codes (case-insensitive). A failing
/// or empty instrument is reported in [`BatchOutcome::skipped`] and does not
/// stop the batch; a missing base directory does.
pub fn run_batch(
    base: &Path,
    only: &[String],
    config: &FlowConfig,
) -> Result<BatchOutcome, CoreError> {
    let mut instruments = list_instruments(base)?;
    let mut skipped = Vec::new();

    if !only.is_empty() {
        instruments.retain(|instrument| {
            only.iter()
                .any(|code| code.eq_ignore_ascii_case(&instrument.code))
        });
        for code in only {
            if !instruments
                .iter()
                .any(|instrument| instrument.code.eq_ignore_ascii_case(code))
            {
                log::warn!("{code}: instrument folder not found under {}", base.display());
                skipped.push(SkippedInstrument {
                    code: code.clone(),
                    reason: "instrument folder not found".to_owned(),
                });
            }
        }
    }

    let results: Vec<(String, Result<Option<StockReport>, CoreError>)> = instruments
        .par_iter()
        .map(|instrument| {
            (
                instrument.code.clone(),
                process_instrument(instrument, config),
            )
        })
        .collect();

    let mut stocks = BTreeMap::new();
    for (code, result) in results {
        match result {
            Ok(Some(report)) => {
                stocks.insert(code, report);
            }
            Ok(None) => {
                log::warn!("{code}: no snapshot files, skipping");
                skipped.push(SkippedInstrument {
                    code,
                    reason: "no snapshot files".to_owned(),
                });
            }
            Err(error) => {
                log::warn!("{code}: skipping after error: {error}");
                skipped.push(SkippedInstrument {
                    code,
                    reason: error.to_string(),
                });
            }
        }
    }

    log::info!(
        "processed {} instruments, skipped {}",
        stocks.len(),
        skipped.len()
    );

    Ok(BatchOutcome {
        report: Report {
            generated_at: GeneratedAt::now(),
            stocks,
        },
        skipped,
    })
}
