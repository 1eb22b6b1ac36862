use serde::Serialize;

use crate::aggregate::Summary;
use crate::signal::SignalResult;
use crate::volatility::VolatilityTrend;
use crate::zones::PriceRecommendation;
use crate::{Cohort, ConfidenceLevel, Recommendation, TrendDirection};

const MIN_SCORE: i32 = 0;
const MAX_SCORE: i32 = 100;

/// Everything the confidence score looks at, lifted out of the pipeline outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInputs {
    pub whale_net: f64,
    pub trend_direction: TrendDirection,
    pub recommendation: Recommendation,
    pub rr_ratio: f64,
    pub display_rr: f64,
    pub min_whale_buy: f64,
    pub max_whale_buy: f64,
    pub avg_whale_buy: f64,
    pub volatility_factor: f64,
}

impl ConfidenceInputs {
    pub fn from_pipeline(
        summary: &Summary,
        trend: &VolatilityTrend,
        signal: &SignalResult,
        zones: &PriceRecommendation,
    ) -> Self {
        Self {
            whale_net: summary.net(Cohort::Whale),
            trend_direction: trend.trend_direction,
            recommendation: signal.recommendation,
            rr_ratio: zones.rr_ratio(),
            display_rr: zones.display_rr(),
            min_whale_buy: trend.min_whale_buy,
            max_whale_buy: trend.max_whale_buy,
            avg_whale_buy: trend.avg_whale_buy,
            volatility_factor: trend.volatility_factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceResult {
    pub confidence_score: i32,
    pub confidence_level: ConfidenceLevel,
    pub confidence_factors: Vec<String>,
}

#[derive(Debug, Default)]
struct Tally {
    score: i32,
    factors: Vec<String>,
}

impl Tally {
    fn add(&mut self, points: i32, factor: impl Into<String>) {
        self.score += points;
        self.factors.push(factor.into());
    }
}

/// Scores how much the recommendation can be trusted, clamped to 0..=100.
pub fn assess(inputs: &ConfidenceInputs) -> ConfidenceResult {
    let mut tally = Tally::default();

    if inputs.whale_net > 5.0 {
        tally.add(25, "Strong institutional accumulation");
    } else if inputs.whale_net > 1.0 {
        tally.add(15, "Moderate institutional accumulation");
    }

    match (inputs.trend_direction, inputs.recommendation) {
        (TrendDirection::Uptrend, Recommendation::Buy) => {
            tally.add(20, "Uptrend aligned with BUY");
        }
        (TrendDirection::Downtrend, Recommendation::Sell) => {
            tally.add(20, "Downtrend aligned with SELL");
        }
        (TrendDirection::Sideways, _) => tally.add(5, "Sideways market, stay cautious"),
        _ => {}
    }

    let rr = inputs.rr_ratio;
    let shown = inputs.display_rr;
    if !rr.is_nan() {
        if rr >= 3.0 {
            tally.add(20, format!("Excellent R:R ({shown:.1}:1)"));
        } else if rr >= 2.0 {
            tally.add(15, format!("Good R:R ({shown:.1}:1)"));
        } else if rr >= 1.5 {
            tally.add(10, format!("Moderate R:R ({shown:.1}:1)"));
        } else {
            tally.add(-10, format!("Weak R:R ({shown:.1}:1)"));
        }
    }

    if inputs.max_whale_buy > inputs.min_whale_buy {
        let position = (inputs.avg_whale_buy - inputs.min_whale_buy)
            / (inputs.max_whale_buy - inputs.min_whale_buy);
        if position < 0.3 {
            tally.add(15, "Price near the lower support");
        } else if position > 0.7 {
            tally.add(-10, "Price near the upper resistance");
        }
    }

    if inputs.volatility_factor < 0.05 {
        tally.add(10, "Low volatility (stable)");
    } else if inputs.volatility_factor > 0.15 {
        tally.add(-10, "High volatility (risky)");
    }

    let score = tally.score.clamp(MIN_SCORE, MAX_SCORE);
    ConfidenceResult {
        confidence_score: score,
        confidence_level: ConfidenceLevel::from_score(score),
        confidence_factors: tally.factors,
    }
}
