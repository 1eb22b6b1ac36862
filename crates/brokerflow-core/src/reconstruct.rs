//! Turns cumulative snapshots into per-day broker activity.

use std::collections::BTreeMap;

use crate::snapshot::{BrokerPosition, DatedSnapshot, Snapshot};
use crate::{CohortPair, FlowConfig, TradingDate};

/// One day's reconstructed activity per broker code.
pub type DayDeltas = BTreeMap<String, BrokerDelta>;

/// Difference between two cumulative readings.
///
/// A missing prior reading or a counter that went backwards (new reporting
/// period) is treated as fresh accumulation, so the result is never negative
/// for non-negative input.
pub fn daily_delta(current: f64, prior: Option<f64>) -> f64 {
    match prior {
        Some(prior) if current >= prior => current - prior,
        _ => current,
    }
}

/// One broker's activity on one day.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrokerDelta {
    pub buy_value: f64,
    pub sell_value: f64,
    pub buy_lots: f64,
    pub sell_lots: f64,
    /// Cumulative buy average of the snapshot, used as the day's price proxy.
    pub buy_avg: f64,
    pub sell_avg: f64,
}

impl BrokerDelta {
    pub fn between(current: &BrokerPosition, prior: Option<&BrokerPosition>) -> Self {
        Self {
            buy_value: daily_delta(current.buy_value, prior.map(|p| p.buy_value)),
            sell_value: daily_delta(current.sell_value, prior.map(|p| p.sell_value)),
            buy_lots: daily_delta(current.buy_lots, prior.map(|p| p.buy_lots)),
            sell_lots: daily_delta(current.sell_lots, prior.map(|p| p.sell_lots)),
            buy_avg: current.buy_avg,
            sell_avg: current.sell_avg,
        }
    }

    pub fn has_activity(&self) -> bool {
        self.buy_value > 0.0 || self.sell_value > 0.0
    }
}

/// Reconstructs daily activity for an already ordered snapshot series.
///
/// Each snapshot is compared with the one immediately before it only.
/// Brokers missing from a snapshot have no entry for that day.
pub fn reconstruct<'a, I>(snapshots: I) -> Vec<DayDeltas>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut prior: Option<&Snapshot> = None;
    let mut days = Vec::new();

    for snapshot in snapshots {
        let day = snapshot
            .brokers
            .iter()
            .map(|(code, position)| {
                let previous = prior.and_then(|prior| prior.position(code));
                (code.clone(), BrokerDelta::between(position, previous))
            })
            .collect();
        days.push(day);
        prior = Some(snapshot);
    }

    days
}

/// Stable sort by date with undated items last.
pub fn order_by_date<T>(items: &mut [T], date_of: impl Fn(&T) -> Option<TradingDate>) {
    items.sort_by_key(|item| match date_of(item) {
        Some(date) => (false, Some(date)),
        None => (true, None),
    });
}

pub fn order_snapshots(snapshots: &mut [DatedSnapshot]) {
    order_by_date(snapshots, |snapshot| snapshot.date);
}

/// Running `Σ(value × weight) / Σ(weight)` over strictly positive weights.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightedAverage {
    weighted_sum: f64,
    weight: f64,
}

impl WeightedAverage {
    pub fn add(&mut self, value: f64, weight: f64) {
        if weight > 0.0 {
            self.weighted_sum += value * weight;
            self.weight += weight;
        }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn value(&self) -> f64 {
        if self.weight > 0.0 {
            self.weighted_sum / self.weight
        } else {
            0.0
        }
    }
}

/// One cohort's totals for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CohortDay {
    pub buy_value: f64,
    pub sell_value: f64,
    pub buy_lots: f64,
    pub sell_lots: f64,
    /// Buy average weighted by each broker's daily buy lots.
    pub buy_avg: WeightedAverage,
    pub sell_avg: WeightedAverage,
}

impl CohortDay {
    pub fn add(&mut self, delta: &BrokerDelta) {
        self.buy_value += delta.buy_value;
        self.sell_value += delta.sell_value;
        self.buy_lots += delta.buy_lots;
        self.sell_lots += delta.sell_lots;
        self.buy_avg.add(delta.buy_avg, delta.buy_lots);
        self.sell_avg.add(delta.sell_avg, delta.sell_lots);
    }

    pub fn net(&self) -> f64 {
        self.buy_value - self.sell_value
    }
}

/// Splits one day's broker activity into the two cohorts.
pub fn cohort_day(deltas: &DayDeltas, config: &FlowConfig) -> CohortPair<CohortDay> {
    let mut pair = CohortPair::<CohortDay>::default();
    for (code, delta) in deltas {
        pair.get_mut(config.cohort_of(code)).add(delta);
    }
    pair
}
