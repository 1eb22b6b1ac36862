//! Core pipeline for brokerflow.
//!
//! This crate contains:
//! - Snapshot parsing and cumulative-to-daily reconstruction
//! - Cohort aggregation, broker rollups and the instrument summary
//! - Signal scoring, volatility/trend, price zones and confidence
//! - Directory discovery and the parallel batch runner

pub mod aggregate;
pub mod confidence;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod insights;
pub mod reconstruct;
pub mod report;
mod rounding;
pub mod signal;
pub mod snapshot;
pub mod tick;
pub mod volatility;
pub mod zones;

pub use aggregate::{aggregate, BrokerRollup, CohortTotals, DailyRecord, FlowSeries, Summary};
pub use confidence::{assess, ConfidenceInputs, ConfidenceResult};
pub use config::{FlowConfig, CONFIG_ENV_VAR};
pub use discovery::{list_instruments, scan_instrument, InstrumentDir, SnapshotFile};
pub use domain::{
    Cohort, CohortPair, ConfidenceLevel, GeneratedAt, PriceTrend, Recommendation, RetailReason,
    Sentiment, Strength, TradingDate, TrapLevel, TrendDirection,
};
pub use error::{ConfigError, CoreError, DiscoveryError, ValidationError};
pub use insights::Insights;
pub use reconstruct::{daily_delta, order_snapshots, reconstruct, BrokerDelta, CohortDay};
pub use report::{
    analyze_instrument, load_instrument, process_instrument, run_batch, BatchOutcome, Report,
    SkippedInstrument, StockReport,
};
pub use signal::SignalResult;
pub use snapshot::{BrokerPosition, DatedSnapshot, Snapshot};
pub use volatility::VolatilityTrend;
pub use zones::{PriceRecommendation, PriceZones};
