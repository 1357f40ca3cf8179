//! Event-risk flags raised straight from the facts.
//!
//! Flags are reported beside a judgment and never feed the score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;
use crate::facts::MarketFacts;
use crate::state::series;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub concentration_risk: EventRule,
    pub volatility_spike: EventRule,
    /// Daily returns used when volatility is computed from prices.
    pub volatility_window: usize,
}

/// A single check: fires when the metric is strictly above `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRule {
    pub enabled: bool,
    pub threshold: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            concentration_risk: EventRule {
                enabled: true,
                threshold: 0.35,
            },
            volatility_spike: EventRule {
                enabled: true,
                threshold: 30.0,
            },
            volatility_window: 30,
        }
    }
}

impl EventConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, rule) in [
            ("events.concentration_risk.threshold", &self.concentration_risk),
            ("events.volatility_spike.threshold", &self.volatility_spike),
        ] {
            if !rule.threshold.is_finite() {
                return Err(ConfigurationError::InvalidThreshold {
                    name,
                    detail: format!("must be finite, got {}", rule.threshold),
                });
            }
        }
        if self.volatility_window < 2 {
            return Err(ConfigurationError::InvalidThreshold {
                name: "events.volatility_window",
                detail: "must be at least 2".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRisk {
    ConcentrationRisk,
    VolatilitySpike,
}

impl EventRisk {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConcentrationRisk => "concentration_risk",
            Self::VolatilitySpike => "volatility_spike",
        }
    }
}

impl fmt::Display for EventRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enabled checks whose metric exceeds its threshold. Missing facts never fire.
pub fn check_event_risks(config: &EventConfig, facts: &MarketFacts) -> Vec<EventRisk> {
    let mut risks = Vec::new();

    let concentration = facts.top_stocks_concentration.filter(|v| v.is_finite());
    if config.concentration_risk.enabled
        && concentration.is_some_and(|c| c > config.concentration_risk.threshold)
    {
        risks.push(EventRisk::ConcentrationRisk);
    }

    let volatility = facts
        .volatility
        .filter(|v| v.is_finite())
        .or_else(|| series::realized_volatility(&facts.historical_prices, config.volatility_window));
    if config.volatility_spike.enabled
        && volatility.is_some_and(|v| v > config.volatility_spike.threshold)
    {
        risks.push(EventRisk::VolatilitySpike);
    }

    risks
}
