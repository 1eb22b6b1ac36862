use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Final action derived from the signal score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    pub const ALL: [Self; 3] = [Self::Buy, Self::Sell, Self::Hold];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

/// Direction a cohort's flow points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Sentiment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        }
    }
}

/// Short-term institutional price direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Up,
    Down,
    #[default]
    Neutral,
}

impl PriceTrend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    /// Buckets the absolute score.
    pub fn from_score(score: f64) -> Self {
        let magnitude = score.abs();
        if magnitude >= 3.0 {
            Self::Strong
        } else if magnitude >= 1.5 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
        }
    }
}

/// How far the latest institutional buy price sits below its lifetime average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrapLevel {
    #[default]
    None,
    Mild,
    Severe,
}

impl TrapLevel {
    pub const fn is_trapped(self) -> bool {
        !matches!(self, Self::None)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mild => "mild",
            Self::Severe => "severe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    Uptrend,
    Downtrend,
    #[default]
    Sideways,
}

impl TrendDirection {
    /// Classifies a percent change with a ±2% sideways band.
    pub fn from_percent(percent: f64) -> Self {
        if percent > 2.0 {
            Self::Uptrend
        } else if percent < -2.0 {
            Self::Downtrend
        } else {
            Self::Sideways
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uptrend => "UPTREND",
            Self::Downtrend => "DOWNTREND",
            Self::Sideways => "SIDEWAYS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: i32) -> Self {
        if score >= 70 {
            Self::High
        } else if score >= 50 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// Why the retail cohort was read as bullish or bearish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetailReason {
    Contrarian,
    Accumulation,
    Distribution,
    Euphoria,
}

impl RetailReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contrarian => "contrarian",
            Self::Accumulation => "accumulation",
            Self::Distribution => "distribution",
            Self::Euphoria => "euphoria",
        }
    }
}

macro_rules! impl_display {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Display for $ty {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

impl_display!(
    Recommendation,
    Sentiment,
    PriceTrend,
    Strength,
    TrapLevel,
    TrendDirection,
    ConfidenceLevel,
    RetailReason,
);
