mod cohort;
mod date;
mod labels;

pub use cohort::{Cohort, CohortPair};
pub use date::{GeneratedAt, TradingDate};
pub use labels::{
    ConfidenceLevel, PriceTrend, Recommendation, RetailReason, Sentiment, Strength, TrapLevel,
    TrendDirection,
};
