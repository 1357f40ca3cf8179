pub mod snapshot;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A market the analysis covers (e.g. `US`, `JP`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSpec {
    pub code: String,
    pub name: String,
}

/// Latest raw indicator readings for one market.
///
/// Every metric is optional: providers fill what they could fetch and the
/// state mapper degrades the rest to `unknown`. Keys follow the provider's
/// wire names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketFacts {
    #[serde(rename = "PMI")]
    pub pmi: Option<f64>,
    #[serde(rename = "GDP_growth")]
    pub gdp_growth: Option<f64>,
    /// CPI index level.
    #[serde(rename = "CPI")]
    pub cpi: Option<f64>,
    /// CPI year-over-year change in percent.
    #[serde(rename = "CPI_change")]
    pub cpi_yoy: Option<f64>,
    /// Recent CPI YoY readings, oldest first.
    pub cpi_yoy_history: Vec<f64>,

    pub employment_rate: Option<f64>,
    pub unemployment_rate: Option<f64>,

    pub policy_rate: Option<f64>,
    pub previous_policy_rate: Option<f64>,
    /// Recent policy rate decisions, oldest first.
    pub policy_rate_history: Vec<f64>,
    pub long_term_rate: Option<f64>,
    pub long_term_rate_history: Vec<f64>,
    pub credit_spread: Option<f64>,

    pub pe_ratio: Option<f64>,
    pub historical_pe: Option<f64>,
    /// Price distance from moving averages in percent.
    pub price_vs_ma20: Option<f64>,
    pub price_vs_ma75: Option<f64>,
    pub price_vs_ma200: Option<f64>,
    /// Annualized 30-day realized volatility in percent.
    pub volatility: Option<f64>,
    /// Daily closes, oldest first. Used when `volatility` is absent.
    pub historical_prices: Vec<f64>,
    pub volume_ratio: Option<f64>,

    /// Index weight of the largest constituents (0-1).
    pub top_stocks_concentration: Option<f64>,
    /// Index weight of AI-related names (0-1).
    pub ai_sector_weight: Option<f64>,
    pub vix: Option<f64>,
    pub geopolitical_events: Vec<String>,
}

/// What a provider returns for one market.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub facts: MarketFacts,
    /// Analyst-pinned states keyed by family name, validated downstream.
    #[serde(default)]
    pub state_overrides: BTreeMap<String, String>,
    /// When the underlying facts were observed, if the provider knows.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

/// Source of raw facts. Retries, caching and fallbacks live behind this seam;
/// the judgment core never waits on or retries a provider.
#[async_trait]
pub trait FactProvider: Send + Sync {
    /// Fetch the latest facts for a market.
    async fn fetch(&self, market: &MarketSpec) -> Result<MarketSnapshot>;

    /// Human-readable name of this provider.
    fn name(&self) -> &str;
}
