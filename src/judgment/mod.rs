pub mod engine;
pub mod rules;

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::InvalidStateError;

/// Evaluation horizon; selects the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Short,
    Medium,
    Long,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Short, Timeframe::Medium, Timeframe::Long];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = InvalidStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            other => Err(InvalidStateError::UnknownTimeframe(other.to_string())),
        }
    }
}

/// Five-way directional label, driven only by the clamped integer score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketView {
    StrongBearish,
    Bearish,
    Neutral,
    Bullish,
    StrongBullish,
}

impl MarketView {
    /// Bucket a score already clamped to [-2, 2].
    pub fn from_score(score: i8) -> Self {
        match score {
            i8::MIN..=-2 => Self::StrongBearish,
            -1 => Self::Bearish,
            0 => Self::Neutral,
            1 => Self::Bullish,
            2..=i8::MAX => Self::StrongBullish,
        }
    }

    pub fn score(self) -> i8 {
        match self {
            Self::StrongBearish => -2,
            Self::Bearish => -1,
            Self::Neutral => 0,
            Self::Bullish => 1,
            Self::StrongBullish => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBearish => "strong_bearish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
            Self::Bullish => "bullish",
            Self::StrongBullish => "strong_bullish",
        }
    }

    /// Arrow glyph for terminal reports.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::StrongBearish => "↓↓",
            Self::Bearish => "↓",
            Self::Neutral => "→",
            Self::Bullish => "↑",
            Self::StrongBullish => "↑↑",
        }
    }
}

impl fmt::Display for MarketView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketView {
    type Err = InvalidStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong_bearish" => Ok(Self::StrongBearish),
            "bearish" => Ok(Self::Bearish),
            "neutral" => Ok(Self::Neutral),
            "bullish" => Ok(Self::Bullish),
            "strong_bullish" => Ok(Self::StrongBullish),
            other => Err(InvalidStateError::UnknownValue {
                family: "market_view".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Outcome of evaluating one rule table over one state vector.
///
/// Built once by the engine and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Judgment {
    pub timeframe: Timeframe,
    pub view: MarketView,
    /// Clamped integer in [-2, 2].
    pub score: i8,
    /// Sum of fired rule deltas before rounding.
    pub raw_score: Decimal,
    /// Explanations of every fired rule, in table order.
    pub reasoning: Vec<String>,
    /// `family:value` for every family, for display only.
    pub key_states: Vec<String>,
}

impl Judgment {
    /// The label the presentation layer shows.
    pub fn direction_label(&self) -> &'static str {
        self.view.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse() {
        assert_eq!("long".parse::<Timeframe>().unwrap(), Timeframe::Long);
        assert_eq!(
            "weekly".parse::<Timeframe>().unwrap_err(),
            InvalidStateError::UnknownTimeframe("weekly".to_string())
        );
    }

    #[test]
    fn test_view_buckets_integer_score() {
        assert_eq!(MarketView::from_score(2), MarketView::StrongBullish);
        assert_eq!(MarketView::from_score(1), MarketView::Bullish);
        assert_eq!(MarketView::from_score(0), MarketView::Neutral);
        assert_eq!(MarketView::from_score(-1), MarketView::Bearish);
        assert_eq!(MarketView::from_score(-2), MarketView::StrongBearish);
    }

    #[test]
    fn test_view_score_round_trips() {
        for score in -2..=2 {
            assert_eq!(MarketView::from_score(score).score(), score);
        }
    }

    #[test]
    fn test_view_serde_snake_case() {
        let json = serde_json::to_string(&MarketView::StrongBearish).unwrap();
        assert_eq!(json, "\"strong_bearish\"");
        assert_eq!("strong_bearish".parse::<MarketView>().unwrap(), MarketView::StrongBearish);
    }
}
