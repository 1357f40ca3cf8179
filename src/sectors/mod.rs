//! Thematic sector suggestions derived from the state vector.
//!
//! Runs beside the judgment engine over the same states but never reads its
//! score: a neutral market can still have active themes.

pub mod recommender;
pub mod themes;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::judgment::Timeframe;

/// An active theme for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub reason: String,
}

/// Primary sectors are `strong`; spillover sectors are `moderate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Strong,
    Moderate,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorSuggestion {
    pub name: String,
    pub theme: String,
    pub reason: String,
    pub related_fields: Vec<String>,
    pub timeframe: Timeframe,
    pub trend: Trend,
}
