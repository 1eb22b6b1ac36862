//! Cohort time series, per-broker rollups and the instrument summary.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::reconstruct::{cohort_day, reconstruct, BrokerDelta, CohortDay, WeightedAverage};
use crate::rounding::{round2, round_lots, round_to};
use crate::snapshot::DatedSnapshot;
use crate::{Cohort, CohortPair, FlowConfig, TradingDate};

const UNKNOWN: &str = "Unknown";

/// Running cumulative totals for one cohort.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CohortTotals {
    pub buy_value: f64,
    pub sell_value: f64,
    pub buy_lots: f64,
    pub sell_lots: f64,
}

impl CohortTotals {
    fn absorb(&mut self, day: &CohortDay) {
        self.buy_value += day.buy_value;
        self.sell_value += day.sell_value;
        self.buy_lots += day.buy_lots;
        self.sell_lots += day.sell_lots;
    }

    pub fn net(&self) -> f64 {
        self.buy_value - self.sell_value
    }

    pub fn net_lots(&self) -> f64 {
        self.buy_lots - self.sell_lots
    }
}

/// One reconstructed trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    /// 1-based position in the series.
    pub day: usize,
    pub date: Option<TradingDate>,
    /// `End` token from the export header.
    pub period_end: Option<String>,
    pub daily: CohortPair<CohortDay>,
    /// Totals through this day, inclusive.
    pub cumulative: CohortPair<CohortTotals>,
}

impl DailyRecord {
    pub fn whale_buy(&self) -> f64 {
        self.daily.whale.buy_value
    }

    pub fn whale_sell(&self) -> f64 {
        self.daily.whale.sell_value
    }

    pub fn whale_buy_avg(&self) -> f64 {
        self.daily.whale.buy_avg.value()
    }

    pub fn whale_sell_avg(&self) -> f64 {
        self.daily.whale.sell_avg.value()
    }

    pub fn cumulative_net(&self, cohort: Cohort) -> f64 {
        self.cumulative.get(cohort).net()
    }
}

#[derive(Serialize)]
struct DailyRow<'a> {
    day: usize,
    date: String,
    date_display: String,
    date_end: &'a str,
    #[serde(serialize_with = "round2")]
    whale_buy: f64,
    #[serde(serialize_with = "round2")]
    retail_buy: f64,
    #[serde(serialize_with = "round2")]
    whale_sell: f64,
    #[serde(serialize_with = "round2")]
    retail_sell: f64,
    #[serde(serialize_with = "round2")]
    whale_buyavg: f64,
    #[serde(serialize_with = "round2")]
    whale_sellavg: f64,
    #[serde(serialize_with = "round2")]
    retail_buyavg: f64,
    #[serde(serialize_with = "round2")]
    retail_sellavg: f64,
    #[serde(serialize_with = "round2")]
    whale_cum_buy: f64,
    #[serde(serialize_with = "round2")]
    retail_cum_buy: f64,
    #[serde(serialize_with = "round2")]
    whale_cum_sell: f64,
    #[serde(serialize_with = "round2")]
    retail_cum_sell: f64,
    #[serde(serialize_with = "round2")]
    whale_net: f64,
    #[serde(serialize_with = "round2")]
    retail_net: f64,
    #[serde(serialize_with = "round2")]
    whale_cum_net: f64,
    #[serde(serialize_with = "round2")]
    retail_cum_net: f64,
    #[serde(serialize_with = "round_lots")]
    whale_cum_buy_lot: f64,
    #[serde(serialize_with = "round_lots")]
    whale_cum_sell_lot: f64,
    #[serde(serialize_with = "round_lots")]
    retail_cum_buy_lot: f64,
    #[serde(serialize_with = "round_lots")]
    retail_cum_sell_lot: f64,
    #[serde(serialize_with = "round_lots")]
    whale_net_lot: f64,
    #[serde(serialize_with = "round_lots")]
    retail_net_lot: f64,
}

impl Serialize for DailyRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let CohortPair {
            whale: day_whale,
            retail: day_retail,
        } = &self.daily;
        let CohortPair {
            whale: cum_whale,
            retail: cum_retail,
        } = &self.cumulative;

        DailyRow {
            day: self.day,
            date: self
                .date
                .map_or_else(|| UNKNOWN.to_owned(), TradingDate::format_iso),
            date_display: self
                .date
                .map_or_else(|| UNKNOWN.to_owned(), TradingDate::format_display),
            date_end: self.period_end.as_deref().unwrap_or(UNKNOWN),
            whale_buy: day_whale.buy_value,
            retail_buy: day_retail.buy_value,
            whale_sell: day_whale.sell_value,
            retail_sell: day_retail.sell_value,
            whale_buyavg: day_whale.buy_avg.value(),
            whale_sellavg: day_whale.sell_avg.value(),
            retail_buyavg: day_retail.buy_avg.value(),
            retail_sellavg: day_retail.sell_avg.value(),
            whale_cum_buy: cum_whale.buy_value,
            retail_cum_buy: cum_retail.buy_value,
            whale_cum_sell: cum_whale.sell_value,
            retail_cum_sell: cum_retail.sell_value,
            whale_net: day_whale.net(),
            retail_net: day_retail.net(),
            whale_cum_net: cum_whale.net(),
            retail_cum_net: cum_retail.net(),
            whale_cum_buy_lot: cum_whale.buy_lots,
            whale_cum_sell_lot: cum_whale.sell_lots,
            retail_cum_buy_lot: cum_retail.buy_lots,
            retail_cum_sell_lot: cum_retail.sell_lots,
            whale_net_lot: cum_whale.net_lots(),
            retail_net_lot: cum_retail.net_lots(),
        }
        .serialize(serializer)
    }
}

/// Lifetime activity of one broker across an instrument's series.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerRollup {
    pub code: String,
    pub name: String,
    pub cohort: Cohort,
    pub buy_value: f64,
    pub sell_value: f64,
    /// `Σ(daily buy avg × daily buy value)` over active days.
    pub buy_weighted: f64,
    pub sell_weighted: f64,
}

impl BrokerRollup {
    fn new(code: &str, config: &FlowConfig) -> Self {
        Self {
            code: code.to_owned(),
            name: config.broker_name(code),
            cohort: config.cohort_of(code),
            buy_value: 0.0,
            sell_value: 0.0,
            buy_weighted: 0.0,
            sell_weighted: 0.0,
        }
    }

    fn record(&mut self, delta: &BrokerDelta) {
        if !delta.has_activity() {
            return;
        }
        self.buy_value += delta.buy_value;
        self.sell_value += delta.sell_value;
        self.buy_weighted += delta.buy_avg * delta.buy_value;
        self.sell_weighted += delta.sell_avg * delta.sell_value;
    }

    pub fn buy_avg(&self) -> f64 {
        if self.buy_value > 0.0 {
            self.buy_weighted / self.buy_value
        } else {
            0.0
        }
    }

    pub fn sell_avg(&self) -> f64 {
        if self.sell_value > 0.0 {
            self.sell_weighted / self.sell_value
        } else {
            0.0
        }
    }

    pub fn net(&self) -> f64 {
        self.buy_value - self.sell_value
    }

    pub fn total(&self) -> f64 {
        self.buy_value + self.sell_value
    }
}

#[derive(Serialize)]
struct BrokerRow<'a> {
    code: &'a str,
    name: &'a str,
    category: Cohort,
    #[serde(serialize_with = "round2")]
    buy: f64,
    #[serde(serialize_with = "round2")]
    sell: f64,
    #[serde(serialize_with = "round2")]
    buyavg: f64,
    #[serde(serialize_with = "round2")]
    sellavg: f64,
    #[serde(serialize_with = "round2")]
    buyavg_weighted: f64,
    #[serde(serialize_with = "round2")]
    sellavg_weighted: f64,
    #[serde(serialize_with = "round2")]
    net: f64,
    #[serde(serialize_with = "round2")]
    total: f64,
}

impl Serialize for BrokerRollup {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        BrokerRow {
            code: &self.code,
            name: &self.name,
            category: self.cohort,
            buy: self.buy_value,
            sell: self.sell_value,
            buyavg: self.buy_avg(),
            sellavg: self.sell_avg(),
            buyavg_weighted: self.buy_weighted,
            sellavg_weighted: self.sell_weighted,
            net: self.net(),
            total: self.total(),
        }
        .serialize(serializer)
    }
}

/// Instrument-level rollup of the whole series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub totals: CohortPair<CohortTotals>,
    /// Daily cohort averages weighted by each day's cohort lot volume.
    pub buy_avg: CohortPair<f64>,
    pub sell_avg: CohortPair<f64>,
}

impl Summary {
    pub fn net(&self, cohort: Cohort) -> f64 {
        self.totals.get(cohort).net()
    }

    pub fn whale_buy_avg(&self) -> f64 {
        self.buy_avg.whale
    }

    pub fn whale_sell_avg(&self) -> f64 {
        self.sell_avg.whale
    }
}

#[derive(Serialize)]
struct SummaryRow {
    #[serde(serialize_with = "round2")]
    whale_buy: f64,
    #[serde(serialize_with = "round2")]
    retail_buy: f64,
    #[serde(serialize_with = "round2")]
    whale_sell: f64,
    #[serde(serialize_with = "round2")]
    retail_sell: f64,
    #[serde(serialize_with = "round2")]
    whale_buyavg: f64,
    #[serde(serialize_with = "round2")]
    retail_buyavg: f64,
    #[serde(serialize_with = "round2")]
    whale_sellavg: f64,
    #[serde(serialize_with = "round2")]
    retail_sellavg: f64,
    #[serde(serialize_with = "round2")]
    whale_net: f64,
    #[serde(serialize_with = "round2")]
    retail_net: f64,
    #[serde(serialize_with = "round2")]
    total_buy: f64,
    #[serde(serialize_with = "round2")]
    total_sell: f64,
    #[serde(serialize_with = "round_lots")]
    whale_cum_buy_lot: f64,
    #[serde(serialize_with = "round_lots")]
    whale_cum_sell_lot: f64,
    #[serde(serialize_with = "round_lots")]
    retail_cum_buy_lot: f64,
    #[serde(serialize_with = "round_lots")]
    retail_cum_sell_lot: f64,
    #[serde(serialize_with = "round_lots")]
    whale_net_lot: f64,
    #[serde(serialize_with = "round_lots")]
    retail_net_lot: f64,
}

impl Serialize for Summary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let CohortPair { whale, retail } = &self.totals;
        SummaryRow {
            whale_buy: whale.buy_value,
            retail_buy: retail.buy_value,
            whale_sell: whale.sell_value,
            retail_sell: retail.sell_value,
            whale_buyavg: self.buy_avg.whale,
            retail_buyavg: self.buy_avg.retail,
            whale_sellavg: self.sell_avg.whale,
            retail_sellavg: self.sell_avg.retail,
            whale_net: whale.net(),
            retail_net: retail.net(),
            total_buy: whale.buy_value + retail.buy_value,
            total_sell: whale.sell_value + retail.sell_value,
            whale_cum_buy_lot: whale.buy_lots,
            whale_cum_sell_lot: whale.sell_lots,
            retail_cum_buy_lot: retail.buy_lots,
            retail_cum_sell_lot: retail.sell_lots,
            whale_net_lot: whale.net_lots(),
            retail_net_lot: retail.net_lots(),
        }
        .serialize(serializer)
    }
}

/// Everything derived directly from the reconstructed series.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSeries {
    pub daily: Vec<DailyRecord>,
    /// Sorted by lifetime `buy + sell`, largest first.
    pub brokers: Vec<BrokerRollup>,
    pub summary: Summary,
}

/// Aggregates an ordered snapshot series into daily records, rollups and a summary.
pub fn aggregate(snapshots: &[DatedSnapshot], config: &FlowConfig) -> FlowSeries {
    let deltas = reconstruct(snapshots.iter().map(|dated| &dated.snapshot));

    let mut running = CohortPair::<CohortTotals>::default();
    let mut buy_avg = CohortPair::<WeightedAverage>::default();
    let mut sell_avg = CohortPair::<WeightedAverage>::default();
    let mut rollups: BTreeMap<String, BrokerRollup> = BTreeMap::new();
    let mut daily = Vec::with_capacity(deltas.len());

    for (index, (dated, day_deltas)) in snapshots.iter().zip(&deltas).enumerate() {
        for (code, delta) in day_deltas {
            rollups
                .entry(code.clone())
                .or_insert_with(|| BrokerRollup::new(code, config))
                .record(delta);
        }

        let cohorts = cohort_day(day_deltas, config);
        for cohort in Cohort::ALL {
            let day = cohorts.get(cohort);
            running.get_mut(cohort).absorb(day);
            buy_avg
                .get_mut(cohort)
                .add(day.buy_avg.value(), day.buy_avg.weight());
            sell_avg
                .get_mut(cohort)
                .add(day.sell_avg.value(), day.sell_avg.weight());
        }

        daily.push(DailyRecord {
            day: index + 1,
            date: dated.date,
            period_end: dated.snapshot.period_end.clone(),
            daily: cohorts,
            cumulative: running,
        });
    }

    let mut brokers: Vec<BrokerRollup> = rollups.into_values().collect();
    brokers.sort_by(|a, b| round_to(b.total(), 2).total_cmp(&round_to(a.total(), 2)));

    let summary = Summary {
        totals: running,
        buy_avg: buy_avg.map(WeightedAverage::value),
        sell_avg: sell_avg.map(WeightedAverage::value),
    };

    FlowSeries {
        daily,
        brokers,
        summary,
    }
}
