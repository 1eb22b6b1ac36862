//! Exchange tick-size grid.
//!
//! Prices are snapped to the minimum increment of their price band. Buy and
//! stop levels round down, target and sell levels round up, and a rounded
//! price never falls below one tick.

/// Upper bound (inclusive) of each price band and the tick that applies to it.
const TICK_BANDS: [(f64, u32); 6] = [
    (200.0, 1),
    (500.0, 2),
    (2_000.0, 5),
    (5_000.0, 10),
    (10_000.0, 25),
    (25_000.0, 50),
];
const TOP_TICK: u32 = 100;

pub fn tick_size(price: f64) -> u32 {
    TICK_BANDS
        .iter()
        .find(|(upper, _)| price <= *upper)
        .map(|(_, tick)| *tick)
        .unwrap_or(TOP_TICK)
}

pub fn round_down(price: f64) -> f64 {
    let tick = f64::from(tick_size(price));
    ((price / tick).floor() * tick).max(tick)
}

pub fn round_up(price: f64) -> f64 {
    let tick = f64::from(tick_size(price));
    ((price / tick).ceil() * tick).max(tick)
}

/// What a price level is used for, which decides the rounding direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingPurpose {
    Buy,
    Target,
    Sell,
    StopLoss,
}

impl RoundingPurpose {
    pub fn round(self, price: f64) -> f64 {
        match self {
            Self::Buy | Self::StopLoss => round_down(price),
            Self::Target | Self::Sell => round_up(price),
        }
    }
}
