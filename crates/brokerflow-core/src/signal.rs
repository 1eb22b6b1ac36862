//! Heuristic accumulation/distribution scoring.
//!
//! The engine walks a fixed sequence of checks over the summary and the
//! daily series. Each check adjusts a running score and appends a readable
//! explanation, and the final score maps to BUY, SELL or HOLD.

use serde::{Serialize, Serializer};

use crate::aggregate::{DailyRecord, Summary};
use crate::rounding::round2;
use crate::{Cohort, PriceTrend, Recommendation, RetailReason, Sentiment, Strength, TrapLevel};

/// Number of trailing days treated as "recent".
pub const RECENT_WINDOW: usize = 5;

const SEVERE_TRAP_RATIO: f64 = 0.20;
const MILD_TRAP_RATIO: f64 = 0.10;
const STRONG_FLOW: f64 = 5.0;
const MODERATE_FLOW: f64 = 1.0;
const TREND_BAND: f64 = 0.02;
const PRICING_BAND: f64 = 0.05;
const MILD_TRAP_BUY_SCORE: f64 = 2.0;
const BUY_SCORE: f64 = 1.0;
const SELL_SCORE: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalResult {
    #[serde(serialize_with = "round2")]
    pub score: f64,
    pub signals: Vec<String>,
    pub whale_signal: Sentiment,
    pub retail_signal: Sentiment,
    #[serde(serialize_with = "reason_or_empty")]
    pub retail_bullish_reason: Option<RetailReason>,
    #[serde(serialize_with = "reason_or_empty")]
    pub retail_bearish_reason: Option<RetailReason>,
    pub price_trend: PriceTrend,
    pub strength: Strength,
    pub recommendation: Recommendation,
    pub is_whale_trapped: bool,
    pub whale_trap_level: TrapLevel,
    /// Most recent nonzero institutional buy average, else the lifetime average.
    #[serde(serialize_with = "round2")]
    pub last_price: f64,
    #[serde(serialize_with = "round2")]
    pub avg_whale_buy: f64,
}

fn reason_or_empty<S: Serializer>(
    reason: &Option<RetailReason>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(reason.map_or("", RetailReason::as_str))
}

#[derive(Debug, Default)]
struct ScoreCard {
    score: f64,
    signals: Vec<String>,
}

impl ScoreCard {
    fn apply(&mut self, delta: f64, explanation: impl Into<String>) {
        self.score += delta;
        self.signals.push(explanation.into());
    }

    fn note(&mut self, explanation: impl Into<String>) {
        self.signals.push(explanation.into());
    }
}

/// Most recent nonzero institutional buy average, searching from the end.
pub fn last_whale_price(daily: &[DailyRecord]) -> Option<f64> {
    daily
        .iter()
        .rev()
        .map(DailyRecord::whale_buy_avg)
        .find(|price| *price > 0.0)
}

/// Trailing window of at most [`RECENT_WINDOW`] days.
pub fn recent_days(daily: &[DailyRecord]) -> &[DailyRecord] {
    &daily[daily.len().saturating_sub(RECENT_WINDOW)..]
}

/// Maps a final score and trap state to an action.
pub fn recommend(score: f64, trap: TrapLevel) -> Recommendation {
    match trap {
        TrapLevel::Severe => Recommendation::Hold,
        TrapLevel::Mild if score >= MILD_TRAP_BUY_SCORE => Recommendation::Buy,
        TrapLevel::Mild => Recommendation::Hold,
        TrapLevel::None if score >= BUY_SCORE => Recommendation::Buy,
        TrapLevel::None if score <= SELL_SCORE => Recommendation::Sell,
        TrapLevel::None => Recommendation::Hold,
    }
}

pub fn evaluate(summary: &Summary, daily: &[DailyRecord]) -> SignalResult {
    let mut card = ScoreCard::default();
    let avg_buy = summary.whale_buy_avg();
    let avg_sell = summary.whale_sell_avg();
    let last_price = last_whale_price(daily);

    let trap_level = match last_price {
        Some(last) if avg_buy > 0.0 => classify_trap(&mut card, avg_buy, last),
        _ => {
            card.note("Institutional status: normal");
            TrapLevel::None
        }
    };

    let whale_signal = score_whale_flow(&mut card, summary.net(Cohort::Whale));
    let (retail_signal, bullish_reason, bearish_reason) =
        score_retail_flow(&mut card, summary.net(Cohort::Retail));
    let price_trend = score_recent_trend(&mut card, daily, avg_buy);

    if avg_buy > 0.0 {
        if avg_sell > avg_buy * (1.0 + PRICING_BAND) {
            card.apply(1.0, "Institutions selling above their buy price (taking profit)");
        } else if avg_sell < avg_buy * (1.0 - PRICING_BAND) {
            card.apply(-1.0, "Institutions selling below their buy price (cutting loss)");
        }
    }

    let strength = Strength::from_score(card.score);
    let recommendation = recommend(card.score, trap_level);
    match (trap_level, recommendation) {
        (TrapLevel::Severe, _) => card.note(
            "Recommendation: HOLD - wait for price to stabilise near the institutional buy area",
        ),
        (TrapLevel::Mild, Recommendation::Buy) => {
            card.note("Recommendation: BUY (speculative) - institutions mildly trapped")
        }
        (TrapLevel::Mild, _) => {
            card.note("Recommendation: HOLD - institutions trapped, wait for confirmation")
        }
        (TrapLevel::None, _) => {}
    }

    SignalResult {
        score: card.score,
        signals: card.signals,
        whale_signal,
        retail_signal,
        retail_bullish_reason: bullish_reason,
        retail_bearish_reason: bearish_reason,
        price_trend,
        strength,
        recommendation,
        is_whale_trapped: trap_level.is_trapped(),
        whale_trap_level: trap_level,
        last_price: last_price.unwrap_or(avg_buy),
        avg_whale_buy: avg_buy,
    }
}

fn classify_trap(card: &mut ScoreCard, avg_buy: f64, last: f64) -> TrapLevel {
    let ratio = (avg_buy - last) / avg_buy;
    let percent = ratio * 100.0;
    if ratio > SEVERE_TRAP_RATIO {
        card.apply(
            -3.0,
            format!("Institutions severely trapped (price {percent:.0}% below their average buy)"),
        );
        TrapLevel::Severe
    } else if ratio > MILD_TRAP_RATIO {
        card.apply(
            -1.0,
            format!("Institutions trapped (price {percent:.0}% below their average buy)"),
        );
        TrapLevel::Mild
    } else {
        TrapLevel::None
    }
}

fn score_whale_flow(card: &mut ScoreCard, net: f64) -> Sentiment {
    if net > STRONG_FLOW {
        card.apply(2.0, "Institutions accumulating strongly");
        Sentiment::Bullish
    } else if net > MODERATE_FLOW {
        card.apply(1.0, "Institutions accumulating moderately");
        Sentiment::Bullish
    } else if net < -STRONG_FLOW {
        card.apply(-2.0, "Institutions distributing strongly");
        Sentiment::Bearish
    } else if net < -MODERATE_FLOW {
        card.apply(-1.0, "Institutions distributing moderately");
        Sentiment::Bearish
    } else {
        card.note("Institutions neutral/sideways");
        Sentiment::Neutral
    }
}

/// Retail flow read as a contrarian indicator.
fn score_retail_flow(
    card: &mut ScoreCard,
    net: f64,
) -> (Sentiment, Option<RetailReason>, Option<RetailReason>) {
    if net < -STRONG_FLOW {
        card.apply(1.0, "Retail panic selling (contrarian bullish)");
        (Sentiment::Bullish, Some(RetailReason::Contrarian), None)
    } else if net < -MODERATE_FLOW {
        card.apply(-0.5, "Retail distributing");
        (Sentiment::Bearish, None, Some(RetailReason::Distribution))
    } else if net > STRONG_FLOW {
        card.apply(-1.0, "Retail euphoria/excess accumulation (sign of a top)");
        (Sentiment::Bearish, None, Some(RetailReason::Euphoria))
    } else if net > MODERATE_FLOW {
        card.apply(0.5, "Retail accumulating normally");
        (Sentiment::Bullish, Some(RetailReason::Accumulation), None)
    } else {
        card.note("Retail neutral (sideways)");
        (Sentiment::Neutral, None, None)
    }
}

fn score_recent_trend(card: &mut ScoreCard, daily: &[DailyRecord], avg_buy: f64) -> PriceTrend {
    if avg_buy <= 0.0 {
        return PriceTrend::Neutral;
    }

    let recent = recent_days(daily);
    let recent_avg = if recent.is_empty() {
        0.0
    } else {
        recent.iter().map(DailyRecord::whale_buy_avg).sum::<f64>() / recent.len() as f64
    };

    if recent_avg > avg_buy * (1.0 + TREND_BAND) {
        card.apply(0.5, "Price trending up (last 5 days)");
        PriceTrend::Up
    } else if recent_avg < avg_buy * (1.0 - TREND_BAND) {
        card.apply(-0.5, "Price trending down (last 5 days)");
        PriceTrend::Down
    } else {
        card.note("Price stable/sideways");
        PriceTrend::Neutral
    }
}
