use serde::Serialize;

use crate::aggregate::DailyRecord;
use crate::rounding::{round2, round4};
use crate::TrendDirection;

const FALLBACK_VOLATILITY: f64 = 0.05;
const FALLBACK_DAILY_RANGE: f64 = 0.02;

/// Price spread and direction of institutional buying over the series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityTrend {
    #[serde(serialize_with = "round4")]
    pub volatility_factor: f64,
    pub trend_direction: TrendDirection,
    /// Absolute first-half to second-half change, in percent.
    #[serde(serialize_with = "round2")]
    pub trend_strength: f64,
    #[serde(serialize_with = "round2")]
    pub min_whale_buy: f64,
    #[serde(serialize_with = "round2")]
    pub max_whale_buy: f64,
    #[serde(serialize_with = "round2")]
    pub avg_whale_buy: f64,
    #[serde(serialize_with = "round2")]
    pub avg_whale_sell: f64,
    #[serde(serialize_with = "round2")]
    pub last_whale_buy_price: f64,
    /// Mean same-day `(sell - buy) / buy` spread.
    #[serde(skip)]
    pub avg_daily_range: f64,
}

impl Default for VolatilityTrend {
    fn default() -> Self {
        Self {
            volatility_factor: FALLBACK_VOLATILITY,
            trend_direction: TrendDirection::Sideways,
            trend_strength: 0.0,
            min_whale_buy: 0.0,
            max_whale_buy: 0.0,
            avg_whale_buy: 0.0,
            avg_whale_sell: 0.0,
            last_whale_buy_price: 0.0,
            avg_daily_range: FALLBACK_DAILY_RANGE,
        }
    }
}

/// Nonzero institutional buy averages, in series order.
pub fn whale_buy_prices(daily: &[DailyRecord]) -> Vec<f64> {
    daily
        .iter()
        .map(DailyRecord::whale_buy_avg)
        .filter(|price| *price > 0.0)
        .collect()
}

/// Nonzero institutional sell averages, in series order.
pub fn whale_sell_prices(daily: &[DailyRecord]) -> Vec<f64> {
    daily
        .iter()
        .map(DailyRecord::whale_sell_avg)
        .filter(|price| *price > 0.0)
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean of `(sell - buy) / buy` over days where institutions sold above their buy price.
pub fn average_daily_range(daily: &[DailyRecord]) -> f64 {
    let ranges: Vec<f64> = daily
        .iter()
        .filter_map(|record| {
            let buy = record.whale_buy_avg();
            let sell = record.whale_sell_avg();
            (buy > 0.0 && sell > buy).then(|| (sell - buy) / buy)
        })
        .collect();
    mean(&ranges).unwrap_or(FALLBACK_DAILY_RANGE)
}

pub fn analyze(daily: &[DailyRecord]) -> VolatilityTrend {
    let buys = whale_buy_prices(daily);
    let (Some(&last), Some(avg_buy)) = (buys.last(), mean(&buys)) else {
        return VolatilityTrend::default();
    };

    let min_buy = buys.iter().copied().fold(f64::INFINITY, f64::min);
    let max_buy = buys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg_sell = mean(&whale_sell_prices(daily)).unwrap_or(0.0);

    let avg_daily_range = average_daily_range(daily);
    let range_volatility = if avg_buy > 0.0 {
        (max_buy - min_buy) / avg_buy
    } else {
        FALLBACK_VOLATILITY
    };

    let trend_percent = half_over_half_percent(daily);

    VolatilityTrend {
        volatility_factor: range_volatility.max(avg_daily_range),
        trend_direction: TrendDirection::from_percent(trend_percent),
        trend_strength: trend_percent.abs(),
        min_whale_buy: min_buy,
        max_whale_buy: max_buy,
        avg_whale_buy: avg_buy,
        avg_whale_sell: avg_sell,
        last_whale_buy_price: last,
        avg_daily_range,
    }
}

/// Percent change of the mean buy average from the first half of the series to the second.
///
/// A single-day series compares the whole series against itself.
fn half_over_half_percent(daily: &[DailyRecord]) -> f64 {
    let mid = daily.len() / 2;
    let (first, second) = if mid == 0 {
        (daily, daily)
    } else {
        daily.split_at(mid)
    };

    let half_mean = |half: &[DailyRecord]| {
        let prices: Vec<f64> = half.iter().map(DailyRecord::whale_buy_avg).collect();
        mean(&prices).unwrap_or(0.0)
    };
    let first_avg = half_mean(first);
    let second_avg = half_mean(second);

    if first_avg > 0.0 {
        (second_avg - first_avg) / first_avg * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::CohortDay;
    use crate::CohortPair;

    fn record(buy_avg: f64, sell_avg: f64) -> DailyRecord {
        let mut whale = CohortDay::default();
        whale.buy_avg.add(buy_avg, 1.0);
        whale.sell_avg.add(sell_avg, 1.0);
        DailyRecord {
            day: 1,
            date: None,
            period_end: None,
            daily: CohortPair::new(whale, CohortDay::default()),
            cumulative: CohortPair::default(),
        }
    }

    #[test]
    fn empty_series_uses_fallbacks() {
        let trend = analyze(&[record(0.0, 0.0)]);
        assert_eq!(trend, VolatilityTrend::default());
        assert_eq!(trend.volatility_factor, 0.05);
        assert_eq!(trend.trend_direction, TrendDirection::Sideways);
    }

    #[test]
    fn detects_uptrend_and_range_volatility() {
        let daily = [
            record(100.0, 0.0),
            record(100.0, 101.0),
            record(110.0, 0.0),
            record(110.0, 0.0),
        ];
        let trend = analyze(&daily);

        assert_eq!(trend.trend_direction, TrendDirection::Uptrend);
        assert!((trend.trend_strength - 10.0).abs() < 1e-9);
        assert_eq!(trend.min_whale_buy, 100.0);
        assert_eq!(trend.max_whale_buy, 110.0);
        assert_eq!(trend.avg_whale_buy, 105.0);
        assert_eq!(trend.avg_whale_sell, 101.0);
        assert_eq!(trend.last_whale_buy_price, 110.0);
        assert!((trend.avg_daily_range - 0.01).abs() < 1e-12);
        assert!((trend.volatility_factor - 10.0 / 105.0).abs() < 1e-12);
    }

    #[test]
    fn daily_range_dominates_flat_prices() {
        let daily = [record(100.0, 108.0), record(100.0, 0.0)];
        let trend = analyze(&daily);
        assert!((trend.volatility_factor - 0.08).abs() < 1e-12);
        assert_eq!(trend.trend_direction, TrendDirection::Sideways);
    }

    #[test]
    fn single_day_compares_series_with_itself() {
        let trend = analyze(&[record(250.0, 0.0)]);
        assert_eq!(trend.trend_strength, 0.0);
        assert_eq!(trend.volatility_factor, 0.02);
    }

    #[test]
    fn serializes_camel_case_and_hides_daily_range() {
        let value = serde_json::to_value(analyze(&[record(250.0, 0.0)])).expect("serialize");
        assert_eq!(value["trendDirection"], "SIDEWAYS");
        assert_eq!(value["lastWhaleBuyPrice"], 250.0);
        assert!(value.get("avgDailyRange").is_none());
    }
}
