//! Entry, target, exit and stop levels snapped to the exchange tick grid.

use serde::Serialize;

use crate::aggregate::DailyRecord;
use crate::rounding::{round0, round1, round2, round4};
use crate::signal::{recent_days, SignalResult};
use crate::tick::{round_down, round_up, tick_size, RoundingPurpose};
use crate::volatility::{mean, whale_buy_prices, whale_sell_prices, VolatilityTrend};
use crate::{TrapLevel, TrendDirection};

/// Minimum distance between buy zone and stop loss, as a fraction of the buy zone.
pub const MIN_STOP_GAP: f64 = 0.03;
/// Cap applied to the displayed risk/reward ratio.
pub const DISPLAY_RR_CAP: f64 = 10.0;

/// Price levels for one instrument, or the reason none could be derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PriceRecommendation {
    Available(PriceZones),
    Unavailable(UnavailableZones),
}

impl PriceRecommendation {
    pub fn zones(&self) -> Option<&PriceZones> {
        match self {
            Self::Available(zones) => Some(zones),
            Self::Unavailable(_) => None,
        }
    }

    pub fn rr_ratio(&self) -> f64 {
        self.zones().map_or(0.0, |zones| zones.rr_ratio)
    }

    pub fn display_rr(&self) -> f64 {
        self.zones().map_or(0.0, |zones| zones.display_rr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceZones {
    #[serde(serialize_with = "round0")]
    pub buy_zone: f64,
    #[serde(serialize_with = "round0")]
    pub target_price: f64,
    #[serde(serialize_with = "round0")]
    pub sell_zone: f64,
    #[serde(serialize_with = "round0")]
    pub stop_loss: f64,
    #[serde(serialize_with = "round2")]
    pub rr_ratio: f64,
    #[serde(rename = "displayRR", serialize_with = "round1")]
    pub display_rr: f64,
    /// Upside from buy zone to target, in percent.
    #[serde(serialize_with = "round1")]
    pub potential_profit: f64,
    /// Downside from buy zone to stop, in percent.
    #[serde(serialize_with = "round1")]
    pub potential_loss: f64,
    /// Discount below VWAP, or the premium over last price when trapped.
    #[serde(serialize_with = "round4")]
    pub discount_percent: f64,
    pub is_whale_trapped: bool,
    pub whale_trap_level: TrapLevel,
    #[serde(serialize_with = "round0")]
    pub last_price: f64,
    #[serde(serialize_with = "round0")]
    pub avg_whale_buy: f64,
    pub buy_tick: u32,
    pub target_tick: u32,
    pub sell_tick: u32,
    pub stop_tick: u32,
    #[serde(serialize_with = "round0")]
    pub lowest_recent_buy: f64,
    #[serde(serialize_with = "round0")]
    pub strong_resistance: f64,
    #[serde(serialize_with = "round0")]
    pub min_whale_buy_tick: f64,
    #[serde(serialize_with = "round0")]
    pub max_whale_buy_tick: f64,
}

/// Shape emitted when the series has no institutional buy or sell prices.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableZones {
    pub buy_zone: Option<f64>,
    pub target_price: Option<f64>,
    pub sell_zone: Option<f64>,
    pub stop_loss: Option<f64>,
    pub rr_ratio: f64,
    pub potential_profit: f64,
    pub potential_loss: f64,
}

/// Keeps a tick-rounded stop at least [`MIN_STOP_GAP`] below the buy zone.
///
/// A stop inside the gap moves to exactly `buy_zone * (1 - MIN_STOP_GAP)`,
/// which may sit off the tick grid.
pub fn enforce_stop_gap(buy_zone: f64, stop_loss: f64) -> f64 {
    let min_gap = buy_zone * MIN_STOP_GAP;
    if buy_zone - stop_loss >= min_gap {
        stop_loss
    } else {
        buy_zone - min_gap
    }
}

pub fn risk_reward(buy_zone: f64, target: f64, stop_loss: f64) -> f64 {
    let risk = buy_zone - stop_loss;
    if risk > 0.0 {
        (target - buy_zone) / risk
    } else {
        0.0
    }
}

/// Derives price zones from the daily series, volatility/trend block and signal.
pub fn calculate(
    daily: &[DailyRecord],
    trend: &VolatilityTrend,
    signal: &SignalResult,
) -> PriceRecommendation {
    if whale_buy_prices(daily).is_empty() || whale_sell_prices(daily).is_empty() {
        return PriceRecommendation::Unavailable(UnavailableZones::default());
    }

    let vol = trend.volatility_factor;
    let avg_buy = trend.avg_whale_buy;
    let avg_sell = trend.avg_whale_sell;
    let last_price = signal.last_price;
    let trapped = signal.is_whale_trapped;

    let recent_buys = whale_buy_prices(recent_days(daily));
    let lowest_recent_buy = recent_buys
        .iter()
        .copied()
        .reduce(f64::min)
        .unwrap_or(trend.min_whale_buy);

    let (buy_zone, structural_stop, discount_percent) = if trapped {
        let premium = (vol * 0.5).clamp(0.02, 0.05);
        (last_price * (1.0 + premium), last_price * 0.95, premium)
    } else {
        let discount = (vol * 0.6).clamp(0.02, 0.06);
        let buy_zone = (vwap_buy(daily, avg_buy) * (1.0 - discount))
            .max(lowest_recent_buy * 0.98)
            .max(trend.min_whale_buy * 1.01);
        (buy_zone, lowest_recent_buy * 0.97, discount)
    };

    let resistance = strong_resistance(daily, avg_sell);
    let risk_percent = vol.clamp(0.03, 0.05);

    let (target, sell_zone) = if trapped {
        let target = avg_buy.min(avg_sell).min(buy_zone * 1.15);
        let sell_zone = (avg_buy * 1.03).min(avg_sell).min(buy_zone * 1.20);
        (target, sell_zone)
    } else {
        let target = avg_sell
            .min(resistance)
            .min(buy_zone + buy_zone * risk_percent * 2.5);
        let sell_zone = distribution_zone(daily, avg_buy, avg_sell)
            .max(avg_sell * 1.02)
            .max(trend.max_whale_buy * 1.05);
        (target, sell_zone)
    };

    let atr_multiplier = (vol * 20.0).clamp(1.5, 2.5);
    let volatility_stop = buy_zone - buy_zone * trend.avg_daily_range * atr_multiplier;
    let trend_adjustment = match trend.trend_direction {
        TrendDirection::Uptrend => 1.2,
        TrendDirection::Downtrend => 0.8,
        TrendDirection::Sideways => 1.0,
    };
    let percentage_stop = buy_zone * (1.0 - risk_percent * trend_adjustment);
    let stop_loss = structural_stop.max(volatility_stop).max(percentage_stop);

    let buy_zone = RoundingPurpose::Buy.round(buy_zone);
    let target = RoundingPurpose::Target.round(target);
    let sell_zone = RoundingPurpose::Sell.round(sell_zone);
    let stop_loss = enforce_stop_gap(buy_zone, RoundingPurpose::StopLoss.round(stop_loss));

    let rr_ratio = risk_reward(buy_zone, target, stop_loss);

    PriceRecommendation::Available(PriceZones {
        buy_zone,
        target_price: target,
        sell_zone,
        stop_loss,
        rr_ratio,
        display_rr: rr_ratio.min(DISPLAY_RR_CAP),
        potential_profit: (target - buy_zone) / buy_zone * 100.0,
        potential_loss: (buy_zone - stop_loss) / buy_zone * 100.0,
        discount_percent,
        is_whale_trapped: trapped,
        whale_trap_level: signal.whale_trap_level,
        last_price,
        avg_whale_buy: avg_buy,
        buy_tick: tick_size(buy_zone),
        target_tick: tick_size(target),
        sell_tick: tick_size(sell_zone),
        stop_tick: tick_size(stop_loss),
        lowest_recent_buy: round_down(lowest_recent_buy),
        strong_resistance: round_up(resistance),
        min_whale_buy_tick: round_down(trend.min_whale_buy),
        max_whale_buy_tick: round_up(trend.max_whale_buy),
    })
}

/// Buy average weighted by institutional buy value, falling back to `fallback`.
fn vwap_buy(daily: &[DailyRecord], fallback: f64) -> f64 {
    let (weighted, weight) = daily
        .iter()
        .filter(|record| record.whale_buy_avg() > 0.0 && record.whale_buy() > 0.0)
        .fold((0.0, 0.0), |(weighted, weight), record| {
            (
                weighted + record.whale_buy_avg() * record.whale_buy(),
                weight + record.whale_buy(),
            )
        });
    if weight > 0.0 {
        weighted / weight
    } else {
        fallback
    }
}

/// Mean sell average over days that sold well above the lifetime sell average.
fn strong_resistance(daily: &[DailyRecord], avg_sell: f64) -> f64 {
    let levels: Vec<f64> = daily
        .iter()
        .map(DailyRecord::whale_sell_avg)
        .filter(|sell| *sell > avg_sell * 1.02)
        .collect();
    mean(&levels).unwrap_or(avg_sell)
}

/// Mean sell average over heavy-selling days priced above the lifetime buy average.
fn distribution_zone(daily: &[DailyRecord], avg_buy: f64, avg_sell: f64) -> f64 {
    let levels: Vec<f64> = daily
        .iter()
        .filter(|record| {
            record.whale_sell() > record.whale_buy() * 1.5 && record.whale_sell_avg() > avg_buy
        })
        .map(DailyRecord::whale_sell_avg)
        .collect();
    mean(&levels).unwrap_or(avg_sell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::CohortDay;
    use crate::{
        signal, volatility, CohortPair, PriceTrend, Recommendation, Sentiment, Strength, Summary,
    };

    fn record(day: usize, buy: (f64, f64), sell: (f64, f64)) -> DailyRecord {
        let mut whale = CohortDay {
            buy_value: buy.1,
            sell_value: sell.1,
            ..CohortDay::default()
        };
        whale.buy_avg.add(buy.0, 1.0);
        whale.sell_avg.add(sell.0, 1.0);
        DailyRecord {
            day,
            date: None,
            period_end: None,
            daily: CohortPair::new(whale, CohortDay::default()),
            cumulative: CohortPair::default(),
        }
    }

    fn summary(buy_avg: f64, sell_avg: f64) -> Summary {
        Summary {
            buy_avg: CohortPair::new(buy_avg, 0.0),
            sell_avg: CohortPair::new(sell_avg, 0.0),
            ..Summary::default()
        }
    }

    fn signal_at(last_price: f64, trap: TrapLevel) -> SignalResult {
        SignalResult {
            score: 0.0,
            signals: Vec::new(),
            whale_signal: Sentiment::Neutral,
            retail_signal: Sentiment::Neutral,
            retail_bullish_reason: None,
            retail_bearish_reason: None,
            price_trend: PriceTrend::Neutral,
            strength: Strength::Weak,
            recommendation: Recommendation::Hold,
            is_whale_trapped: trap != TrapLevel::None,
            whale_trap_level: trap,
            last_price,
            avg_whale_buy: 1_000.0,
        }
    }

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    fn run(daily: &[DailyRecord], summary: &Summary) -> PriceRecommendation {
        let result = signal::evaluate(summary, daily);
        calculate(daily, &volatility::analyze(daily), &result)
    }

    #[test]
    fn unavailable_without_institutional_sells() {
        let daily = [record(1, (1_000.0, 2.0), (0.0, 0.0))];
        let zones = run(&daily, &summary(1_000.0, 0.0));

        assert_eq!(zones.zones(), None);
        let value = serde_json::to_value(&zones).expect("serialize");
        assert!(value["buyZone"].is_null());
        assert!(value["stopLoss"].is_null());
        assert_eq!(value["rrRatio"], 0.0);
        assert!(value.get("displayRR").is_none());
    }

    #[test]
    fn levels_are_tick_aligned_and_ordered() {
        let daily = [
            record(1, (1_000.0, 5.0), (1_030.0, 1.0)),
            record(2, (1_010.0, 4.0), (1_060.0, 2.0)),
            record(3, (1_020.0, 3.0), (1_090.0, 6.0)),
            record(4, (1_005.0, 4.0), (1_040.0, 1.0)),
        ];
        let zones = run(&daily, &summary(1_008.0, 1_055.0));
        let zones = zones.zones().expect("zones available");

        for level in [zones.buy_zone, zones.target_price, zones.sell_zone] {
            assert_eq!(level % f64::from(tick_size(level)), 0.0, "level {level}");
        }
        assert!(zones.stop_loss < zones.buy_zone);
        assert!(zones.buy_zone - zones.stop_loss >= zones.buy_zone * MIN_STOP_GAP - 1e-9);
        assert!(zones.sell_zone >= zones.target_price);
        assert!(!zones.is_whale_trapped);
        assert!(zones.display_rr <= DISPLAY_RR_CAP);
    }

    #[test]
    fn trapped_entry_is_anchored_on_last_price() {
        let daily = [
            record(1, (1_000.0, 5.0), (1_010.0, 1.0)),
            record(2, (1_000.0, 5.0), (1_010.0, 1.0)),
            record(3, (700.0, 5.0), (720.0, 1.0)),
        ];
        let zones = run(&daily, &summary(1_000.0, 1_010.0));
        let zones = zones.zones().expect("zones available");

        assert!(zones.is_whale_trapped);
        assert_eq!(zones.whale_trap_level, TrapLevel::Severe);
        assert_eq!(zones.last_price, 700.0);
        // Premium is clamped to at most 5% over the last price.
        assert!(zones.buy_zone <= 735.0);
        assert!(zones.buy_zone >= 700.0);
        assert_eq!(zones.discount_percent, 0.05);
    }

    #[test]
    fn untrapped_zones_follow_vwap_discount_and_resistance() {
        let daily = [
            record(1, (1_000.0, 2.0), (1_030.0, 1.0)),
            record(2, (990.0, 1.0), (1_080.0, 4.0)),
            record(3, (1_020.0, 1.0), (1_040.0, 1.0)),
        ];
        let trend = VolatilityTrend {
            volatility_factor: 0.05,
            trend_direction: TrendDirection::Sideways,
            min_whale_buy: 960.0,
            max_whale_buy: 1_020.0,
            avg_whale_buy: 1_000.0,
            avg_whale_sell: 1_040.0,
            avg_daily_range: 0.02,
            ..VolatilityTrend::default()
        };

        let zones = calculate(&daily, &trend, &signal_at(1_020.0, TrapLevel::None));
        let zones = zones.zones().expect("zones available");

        // VWAP 1002.5 less a 3% discount is 972.43, snapped down to 970.
        assert_eq!(zones.buy_zone, 970.0);
        // min(avg sell 1040, resistance 1080, 972.43 + 12.5%).
        assert_eq!(zones.target_price, 1_040.0);
        // Distribution day at 1080 beats 1060.8 and 1071.
        assert_eq!(zones.sell_zone, 1_080.0);
        // Structural stop 960.3 rounds to 960, inside the gap, so it moves to buy - 3%.
        assert!(close(zones.stop_loss, 970.0 * 0.97), "stop {}", zones.stop_loss);
        assert!(close(zones.rr_ratio, 70.0 / (970.0 - 970.0 * 0.97)));
        assert!(close(zones.potential_loss, 3.0));
        assert_eq!(zones.discount_percent, 0.03);
        assert_eq!(zones.lowest_recent_buy, 990.0);
        assert_eq!(zones.strong_resistance, 1_080.0);
    }

    #[test]
    fn trapped_zones_take_a_premium_over_last_price() {
        let daily = [
            record(1, (1_000.0, 5.0), (1_010.0, 1.0)),
            record(2, (752.0, 5.0), (760.0, 1.0)),
        ];
        let trend = VolatilityTrend {
            volatility_factor: 0.08,
            trend_direction: TrendDirection::Downtrend,
            min_whale_buy: 752.0,
            max_whale_buy: 1_000.0,
            avg_whale_buy: 1_000.0,
            avg_whale_sell: 1_010.0,
            avg_daily_range: 0.03,
            ..VolatilityTrend::default()
        };

        let zones = calculate(&daily, &trend, &signal_at(752.0, TrapLevel::Severe));
        let zones = zones.zones().expect("zones available");

        // 752 plus the 4% premium is 782.08, snapped down to 780.
        assert_eq!(zones.buy_zone, 780.0);
        // min(avg buy, avg sell, 782.08 * 1.15 = 899.39) rounds up to 900.
        assert_eq!(zones.target_price, 900.0);
        // min(1030, avg sell 1010, 782.08 * 1.20 = 938.50) rounds up to 940.
        assert_eq!(zones.sell_zone, 940.0);
        // Downtrend percentage stop 782.08 * 0.96 = 750.80 beats 744.54 and 714.40.
        assert_eq!(zones.stop_loss, 750.0);
        assert!(close(zones.rr_ratio, 4.0));
        assert_eq!(zones.discount_percent, 0.04);
        assert!(zones.is_whale_trapped);
    }

    #[test]
    fn stop_gap_moves_stop_to_exactly_three_percent_below_buy() {
        assert_eq!(enforce_stop_gap(1_000.0, 900.0), 900.0);
        assert_eq!(enforce_stop_gap(1_000.0, 995.0), 1_000.0 - 1_000.0 * MIN_STOP_GAP);

        // 486 less 3% is 471.42; the tick grid below it (470) is not used.
        let stop = enforce_stop_gap(486.0, 484.0);
        assert_eq!(stop, 486.0 - 486.0 * MIN_STOP_GAP);
        assert!(close(stop, 471.42));
        assert!(close(risk_reward(486.0, 510.0, stop), 24.0 / 14.58));
    }

    #[test]
    fn risk_reward_is_zero_without_risk() {
        assert_eq!(risk_reward(100.0, 110.0, 100.0), 0.0);
        assert_eq!(risk_reward(100.0, 110.0, 95.0), 2.0);
    }
}
