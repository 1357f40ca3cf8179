//! Raw facts → discrete states.
//!
//! Each family is a pure threshold function over a `MarketFacts` bundle.
//! Missing or non-finite inputs never fail: the family reads as `unknown`
//! and the gap is logged at debug level.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ConfigurationError, MissingFactError};
use crate::facts::MarketFacts;
use crate::state::series;
use crate::state::{
    EmploymentState, EquityValuationState, ExternalRiskState, GrowthState, InflationState,
    LiquidityState, LongRateState, PolicyRateState, SectorConcentrationState, StateFamily,
    StateValue, StateVector, VolatilityState,
};

/// Cut points for every family. Defaults are the production values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub inflation: InflationThresholds,
    pub policy_rate: PolicyRateThresholds,
    pub employment: EmploymentThresholds,
    pub growth: GrowthThresholds,
    pub long_rate: LongRateThresholds,
    pub equity_valuation: ValuationThresholds,
    pub volatility: VolatilityThresholds,
    pub sector_concentration: ConcentrationThresholds,
    pub liquidity: LiquidityThresholds,
    pub external_risk: ExternalRiskThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InflationThresholds {
    /// CPI YoY (%) below this is low.
    pub low_below: f64,
    /// CPI YoY (%) below this is moderate; at or above is sticky or worse.
    pub moderate_below: f64,
    /// A YoY first difference at or above this marks re-acceleration.
    pub reaccelerating_delta: f64,
    /// Without a trend, a YoY level at or above this is re-acceleration.
    pub reaccelerating_level: f64,
    pub index_low_below: f64,
    pub index_moderate_below: f64,
    pub index_high_below: f64,
}

impl Default for InflationThresholds {
    fn default() -> Self {
        Self {
            low_below: 1.0,
            moderate_below: 3.0,
            reaccelerating_delta: 0.3,
            reaccelerating_level: 5.0,
            index_low_below: 100.0,
            index_moderate_below: 105.0,
            index_high_below: 110.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRateThresholds {
    /// Number of decisions the trend is measured over.
    pub lookback: usize,
    /// Moves smaller than this (percentage points) count as a hold.
    pub hold_band: f64,
}

impl Default for PolicyRateThresholds {
    fn default() -> Self {
        Self {
            lookback: 3,
            hold_band: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmploymentThresholds {
    pub unemployment_strong_below: f64,
    pub unemployment_stable_below: f64,
    pub employment_strong_above: f64,
    pub employment_stable_above: f64,
}

impl Default for EmploymentThresholds {
    fn default() -> Self {
        Self {
            unemployment_strong_below: 3.0,
            unemployment_stable_below: 5.0,
            employment_strong_above: 95.0,
            employment_stable_above: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthThresholds {
    pub pmi_recovery_above: f64,
    pub pmi_stable_above: f64,
    pub gdp_recovery_above: f64,
    pub gdp_stable_above: f64,
}

impl Default for GrowthThresholds {
    fn default() -> Self {
        Self {
            pmi_recovery_above: 55.0,
            pmi_stable_above: 50.0,
            gdp_recovery_above: 3.0,
            gdp_stable_above: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongRateThresholds {
    pub low_below: f64,
    pub high_above: f64,
    /// Ratios to the historical mean, used when a history is supplied.
    pub relative_low: f64,
    pub relative_high: f64,
}

impl Default for LongRateThresholds {
    fn default() -> Self {
        Self {
            low_below: 2.0,
            high_above: 4.0,
            relative_low: 0.8,
            relative_high: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationThresholds {
    pub pe_cheap_below: f64,
    pub pe_high_above: f64,
    pub relative_cheap: f64,
    pub relative_high: f64,
    /// Price vs. moving average (%) cut points.
    pub ma_cheap_below: f64,
    pub ma_high_above: f64,
}

impl Default for ValuationThresholds {
    fn default() -> Self {
        Self {
            pe_cheap_below: 15.0,
            pe_high_above: 25.0,
            relative_cheap: 0.8,
            relative_high: 1.2,
            ma_cheap_below: -5.0,
            ma_high_above: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityThresholds {
    pub low_below: f64,
    pub high_above: f64,
    /// Daily returns used when volatility is computed from prices.
    pub window: usize,
}

impl Default for VolatilityThresholds {
    fn default() -> Self {
        Self {
            low_below: 15.0,
            high_above: 30.0,
            window: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcentrationThresholds {
    pub ai_weight_above: f64,
    pub single_theme_above: f64,
}

impl Default for ConcentrationThresholds {
    fn default() -> Self {
        Self {
            ai_weight_above: 0.30,
            single_theme_above: 0.35,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityThresholds {
    pub spread_loose_below: f64,
    pub spread_tight_above: f64,
    pub volume_tight_below: f64,
    pub volume_loose_above: f64,
}

impl Default for LiquidityThresholds {
    fn default() -> Self {
        Self {
            spread_loose_below: 1.0,
            spread_tight_above: 3.0,
            volume_tight_below: 0.7,
            volume_loose_above: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalRiskThresholds {
    pub vix_medium_above: f64,
    pub vix_high_above: f64,
}

impl Default for ExternalRiskThresholds {
    fn default() -> Self {
        Self {
            vix_medium_above: 15.0,
            vix_high_above: 25.0,
        }
    }
}

impl Thresholds {
    /// Reject non-finite or inverted cut points.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let i = &self.inflation;
        ordered("inflation.low_below < moderate_below", i.low_below, i.moderate_below, Bound::Strict)?;
        ordered("inflation.moderate_below <= reaccelerating_level", i.moderate_below, i.reaccelerating_level, Bound::Inclusive)?;
        ordered("inflation.index_low_below < index_moderate_below", i.index_low_below, i.index_moderate_below, Bound::Strict)?;
        ordered("inflation.index_moderate_below < index_high_below", i.index_moderate_below, i.index_high_below, Bound::Strict)?;
        finite("inflation.reaccelerating_delta", i.reaccelerating_delta)?;

        let p = &self.policy_rate;
        if p.lookback == 0 {
            return Err(ConfigurationError::InvalidThreshold {
                name: "policy_rate.lookback",
                detail: "must be at least 1".to_string(),
            });
        }
        if !p.hold_band.is_finite() || p.hold_band < 0.0 {
            return Err(ConfigurationError::InvalidThreshold {
                name: "policy_rate.hold_band",
                detail: format!("must be a non-negative number, got {}", p.hold_band),
            });
        }

        let e = &self.employment;
        ordered("employment.unemployment_strong_below < unemployment_stable_below", e.unemployment_strong_below, e.unemployment_stable_below, Bound::Strict)?;
        ordered("employment.employment_stable_above < employment_strong_above", e.employment_stable_above, e.employment_strong_above, Bound::Strict)?;

        let g = &self.growth;
        ordered("growth.pmi_stable_above < pmi_recovery_above", g.pmi_stable_above, g.pmi_recovery_above, Bound::Strict)?;
        ordered("growth.gdp_stable_above < gdp_recovery_above", g.gdp_stable_above, g.gdp_recovery_above, Bound::Strict)?;

        let l = &self.long_rate;
        ordered("long_rate.low_below < high_above", l.low_below, l.high_above, Bound::Strict)?;
        ordered("long_rate.relative_low < relative_high", l.relative_low, l.relative_high, Bound::Strict)?;

        let v = &self.equity_valuation;
        ordered("equity_valuation.pe_cheap_below < pe_high_above", v.pe_cheap_below, v.pe_high_above, Bound::Strict)?;
        ordered("equity_valuation.relative_cheap < relative_high", v.relative_cheap, v.relative_high, Bound::Strict)?;
        ordered("equity_valuation.ma_cheap_below < ma_high_above", v.ma_cheap_below, v.ma_high_above, Bound::Strict)?;

        let vol = &self.volatility;
        ordered("volatility.low_below < high_above", vol.low_below, vol.high_above, Bound::Strict)?;
        if vol.window < 2 {
            return Err(ConfigurationError::InvalidThreshold {
                name: "volatility.window",
                detail: "must be at least 2".to_string(),
            });
        }

        let c = &self.sector_concentration;
        finite("sector_concentration.ai_weight_above", c.ai_weight_above)?;
        finite("sector_concentration.single_theme_above", c.single_theme_above)?;

        let q = &self.liquidity;
        ordered("liquidity.spread_loose_below < spread_tight_above", q.spread_loose_below, q.spread_tight_above, Bound::Strict)?;
        ordered("liquidity.volume_tight_below < volume_loose_above", q.volume_tight_below, q.volume_loose_above, Bound::Strict)?;

        let x = &self.external_risk;
        ordered("external_risk.vix_medium_above < vix_high_above", x.vix_medium_above, x.vix_high_above, Bound::Strict)?;

        Ok(())
    }
}

fn finite(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidThreshold {
            name,
            detail: format!("must be finite, got {value}"),
        })
    }
}

/// Whether two cut points may coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Strict,
    Inclusive,
}

fn ordered(name: &'static str, lo: f64, hi: f64, bound: Bound) -> Result<(), ConfigurationError> {
    finite(name, lo)?;
    finite(name, hi)?;
    let ok = match bound {
        Bound::Strict => lo < hi,
        Bound::Inclusive => lo <= hi,
    };
    if ok {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidThreshold {
            name,
            detail: format!("bounds out of order ({lo} vs {hi})"),
        })
    }
}

/// A fact is usable only if present and finite.
fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn missing(family: StateFamily, metric: &'static str) -> MissingFactError {
    MissingFactError {
        family: family.key(),
        metric,
    }
}

/// Maps fact bundles to state vectors with a fixed threshold table.
#[derive(Debug, Clone, Default)]
pub struct StateMapper {
    thresholds: Thresholds,
}

impl StateMapper {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Map one family. Total: a missing input yields the family's `unknown`.
    pub fn map_state(&self, family: StateFamily, facts: &MarketFacts) -> StateValue {
        let mapped = match family {
            StateFamily::Inflation => self.inflation(facts).map(StateValue::Inflation),
            StateFamily::PolicyRate => self.policy_rate(facts).map(StateValue::PolicyRate),
            StateFamily::Employment => self.employment(facts).map(StateValue::Employment),
            StateFamily::Growth => self.growth(facts).map(StateValue::Growth),
            StateFamily::LongRate => self.long_rate(facts).map(StateValue::LongRate),
            StateFamily::EquityValuation => {
                self.equity_valuation(facts).map(StateValue::EquityValuation)
            }
            StateFamily::Volatility => self.volatility(facts).map(StateValue::Volatility),
            StateFamily::SectorConcentration => self
                .sector_concentration(facts)
                .map(StateValue::SectorConcentration),
            StateFamily::Liquidity => self.liquidity(facts).map(StateValue::Liquidity),
            StateFamily::ExternalRisk => self.external_risk(facts).map(StateValue::ExternalRisk),
        };

        mapped.unwrap_or_else(|e| {
            debug!(family = e.family, metric = e.metric, "Missing fact, family reads as unknown");
            family.default_value()
        })
    }

    /// Map every family into a typed vector.
    pub fn map_vector(&self, facts: &MarketFacts) -> StateVector {
        let mut vector = StateVector::default();
        for family in StateFamily::ALL {
            vector.set(self.map_state(family, facts));
        }
        vector
    }

    /// Map every family into a string-keyed vector for external consumers.
    pub fn map_all_states(&self, facts: &MarketFacts) -> BTreeMap<String, String> {
        self.map_vector(facts).to_wire()
    }

    fn inflation(&self, facts: &MarketFacts) -> Result<InflationState, MissingFactError> {
        let t = &self.thresholds.inflation;
        let yoy = usable(facts.cpi_yoy).or_else(|| series::latest(&facts.cpi_yoy_history));

        if let Some(yoy) = yoy {
            if yoy < t.low_below {
                return Ok(InflationState::Low);
            }
            if yoy < t.moderate_below {
                return Ok(InflationState::Moderate);
            }
            return Ok(match series::first_difference(&facts.cpi_yoy_history) {
                Some(delta) if delta >= t.reaccelerating_delta => InflationState::Reaccelerating,
                Some(_) => InflationState::HighSticky,
                None if yoy >= t.reaccelerating_level => InflationState::Reaccelerating,
                None => InflationState::HighSticky,
            });
        }

        // Index level only: coarse fallback
        let index = usable(facts.cpi).ok_or_else(|| missing(StateFamily::Inflation, "CPI_change"))?;
        Ok(if index < t.index_low_below {
            InflationState::Low
        } else if index < t.index_moderate_below {
            InflationState::Moderate
        } else if index < t.index_high_below {
            InflationState::HighSticky
        } else {
            InflationState::Reaccelerating
        })
    }

    fn policy_rate(&self, facts: &MarketFacts) -> Result<PolicyRateState, MissingFactError> {
        let t = &self.thresholds.policy_rate;
        let change = series::change_over(&facts.policy_rate_history, t.lookback).or_else(|| {
            Some(usable(facts.policy_rate)? - usable(facts.previous_policy_rate)?)
        });
        let change = change.ok_or_else(|| missing(StateFamily::PolicyRate, "policy_rate_history"))?;

        Ok(if change.abs() < t.hold_band {
            PolicyRateState::Hold
        } else if change < 0.0 {
            PolicyRateState::Easing
        } else {
            PolicyRateState::Tightening
        })
    }

    fn employment(&self, facts: &MarketFacts) -> Result<EmploymentState, MissingFactError> {
        let t = &self.thresholds.employment;

        if let Some(unemployment) = usable(facts.unemployment_rate) {
            return Ok(if unemployment < t.unemployment_strong_below {
                EmploymentState::Strong
            } else if unemployment < t.unemployment_stable_below {
                EmploymentState::Stable
            } else {
                EmploymentState::Weak
            });
        }

        let employment = usable(facts.employment_rate)
            .ok_or_else(|| missing(StateFamily::Employment, "employment_rate"))?;
        Ok(if employment > t.employment_strong_above {
            EmploymentState::Strong
        } else if employment > t.employment_stable_above {
            EmploymentState::Stable
        } else {
            EmploymentState::Weak
        })
    }

    fn growth(&self, facts: &MarketFacts) -> Result<GrowthState, MissingFactError> {
        let t = &self.thresholds.growth;

        // PMI leads GDP
        if let Some(pmi) = usable(facts.pmi) {
            return Ok(if pmi > t.pmi_recovery_above {
                GrowthState::Recovery
            } else if pmi > t.pmi_stable_above {
                GrowthState::Stable
            } else {
                GrowthState::Slowdown
            });
        }

        let gdp = usable(facts.gdp_growth).ok_or_else(|| missing(StateFamily::Growth, "PMI"))?;
        Ok(if gdp > t.gdp_recovery_above {
            GrowthState::Recovery
        } else if gdp > t.gdp_stable_above {
            GrowthState::Stable
        } else {
            GrowthState::Slowdown
        })
    }

    fn long_rate(&self, facts: &MarketFacts) -> Result<LongRateState, MissingFactError> {
        let t = &self.thresholds.long_rate;
        let rate = usable(facts.long_term_rate)
            .or_else(|| series::latest(&facts.long_term_rate_history))
            .ok_or_else(|| missing(StateFamily::LongRate, "long_term_rate"))?;

        let history_mean = if facts.long_term_rate_history.len() >= 2 {
            series::mean(&facts.long_term_rate_history).filter(|avg| *avg > 0.0)
        } else {
            None
        };

        let (low, high) = match history_mean {
            Some(avg) => (avg * t.relative_low, avg * t.relative_high),
            None => (t.low_below, t.high_above),
        };

        Ok(if rate < low {
            LongRateState::LowLevel
        } else if rate > high {
            LongRateState::HighLevel
        } else {
            LongRateState::MidLevel
        })
    }

    fn equity_valuation(
        &self,
        facts: &MarketFacts,
    ) -> Result<EquityValuationState, MissingFactError> {
        let t = &self.thresholds.equity_valuation;

        if let Some(pe) = usable(facts.pe_ratio) {
            let (cheap, high) = match usable(facts.historical_pe).filter(|h| *h > 0.0) {
                Some(hist) => (hist * t.relative_cheap, hist * t.relative_high),
                None => (t.pe_cheap_below, t.pe_high_above),
            };
            return Ok(classify_valuation(pe, cheap, high));
        }

        // Price vs. moving average as a valuation proxy, longest average first
        let distance = usable(facts.price_vs_ma200)
            .or(usable(facts.price_vs_ma75))
            .or(usable(facts.price_vs_ma20))
            .ok_or_else(|| missing(StateFamily::EquityValuation, "price_vs_ma200"))?;
        Ok(classify_valuation(distance, t.ma_cheap_below, t.ma_high_above))
    }

    fn volatility(&self, facts: &MarketFacts) -> Result<VolatilityState, MissingFactError> {
        let t = &self.thresholds.volatility;
        let vol = usable(facts.volatility)
            .or_else(|| series::realized_volatility(&facts.historical_prices, t.window))
            .ok_or_else(|| missing(StateFamily::Volatility, "volatility"))?;

        Ok(if vol < t.low_below {
            VolatilityState::Low
        } else if vol > t.high_above {
            VolatilityState::High
        } else {
            VolatilityState::Medium
        })
    }

    fn sector_concentration(
        &self,
        facts: &MarketFacts,
    ) -> Result<SectorConcentrationState, MissingFactError> {
        let t = &self.thresholds.sector_concentration;

        if usable(facts.ai_sector_weight).is_some_and(|w| w > t.ai_weight_above) {
            return Ok(SectorConcentrationState::AiHeavy);
        }

        let top = usable(facts.top_stocks_concentration).ok_or_else(|| missing(
            StateFamily::SectorConcentration,
            "top_stocks_concentration",
        ))?;
        Ok(if top > t.single_theme_above {
            SectorConcentrationState::SingleThemeHeavy
        } else {
            SectorConcentrationState::None
        })
    }

    fn liquidity(&self, facts: &MarketFacts) -> Result<LiquidityState, MissingFactError> {
        let t = &self.thresholds.liquidity;

        if let Some(spread) = usable(facts.credit_spread) {
            return Ok(if spread < t.spread_loose_below {
                LiquidityState::Loose
            } else if spread > t.spread_tight_above {
                LiquidityState::Tight
            } else {
                LiquidityState::Neutral
            });
        }

        // Turnover is a weaker proxy, used only without a spread
        let ratio =
            usable(facts.volume_ratio).ok_or_else(|| missing(StateFamily::Liquidity, "credit_spread"))?;
        Ok(if ratio < t.volume_tight_below {
            LiquidityState::Tight
        } else if ratio > t.volume_loose_above {
            LiquidityState::Loose
        } else {
            LiquidityState::Neutral
        })
    }

    fn external_risk(&self, facts: &MarketFacts) -> Result<ExternalRiskState, MissingFactError> {
        let t = &self.thresholds.external_risk;
        let from_vix = usable(facts.vix).map(|vix| {
            if vix > t.vix_high_above {
                ExternalRiskState::High
            } else if vix > t.vix_medium_above {
                ExternalRiskState::Medium
            } else {
                ExternalRiskState::Low
            }
        });
        let has_events = facts
            .geopolitical_events
            .iter()
            .any(|event| !event.trim().is_empty());

        match (from_vix, has_events) {
            (Some(ExternalRiskState::High), _) => Ok(ExternalRiskState::High),
            (_, true) => Ok(ExternalRiskState::Medium),
            (Some(state), false) => Ok(state),
            (None, false) => Err(missing(StateFamily::ExternalRisk, "vix")),
        }
    }
}

fn classify_valuation(value: f64, cheap_below: f64, high_above: f64) -> EquityValuationState {
    if value < cheap_below {
        EquityValuationState::Cheap
    } else if value > high_above {
        EquityValuationState::HighZone
    } else {
        EquityValuationState::Fair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> StateMapper {
        StateMapper::default()
    }

    #[test]
    fn test_empty_facts_map_to_unknown() {
        let vector = mapper().map_vector(&MarketFacts::default());
        assert_eq!(vector, StateVector::default());
    }

    #[test]
    fn test_non_finite_facts_are_missing() {
        let facts = MarketFacts {
            volatility: Some(f64::NAN),
            pmi: Some(f64::INFINITY),
            ..Default::default()
        };
        let vector = mapper().map_vector(&facts);
        assert_eq!(vector.volatility, VolatilityState::Unknown);
        assert_eq!(vector.growth, GrowthState::Unknown);
    }

    #[test]
    fn test_inflation_levels() {
        let m = mapper();
        let at = |yoy: f64| {
            m.inflation(&MarketFacts {
                cpi_yoy: Some(yoy),
                ..Default::default()
            })
            .unwrap()
        };
        assert_eq!(at(0.5), InflationState::Low);
        assert_eq!(at(1.0), InflationState::Moderate);
        assert_eq!(at(2.9), InflationState::Moderate);
        assert_eq!(at(3.0), InflationState::HighSticky);
        assert_eq!(at(4.9), InflationState::HighSticky);
        assert_eq!(at(5.0), InflationState::Reaccelerating);
    }

    #[test]
    fn test_inflation_trend_decides_sticky_vs_reaccelerating() {
        let m = mapper();
        let cooling = MarketFacts {
            cpi_yoy_history: vec![5.5, 5.2, 5.1],
            ..Default::default()
        };
        assert_eq!(m.inflation(&cooling).unwrap(), InflationState::HighSticky);

        let heating = MarketFacts {
            cpi_yoy_history: vec![3.1, 3.2, 3.6],
            ..Default::default()
        };
        assert_eq!(m.inflation(&heating).unwrap(), InflationState::Reaccelerating);
    }

    #[test]
    fn test_inflation_index_fallback() {
        let facts = MarketFacts {
            cpi: Some(107.0),
            ..Default::default()
        };
        assert_eq!(mapper().inflation(&facts).unwrap(), InflationState::HighSticky);
    }

    #[test]
    fn test_policy_rate_trend() {
        let m = mapper();
        let cutting = MarketFacts {
            policy_rate_history: vec![5.5, 5.5, 5.25, 5.0],
            ..Default::default()
        };
        assert_eq!(m.policy_rate(&cutting).unwrap(), PolicyRateState::Easing);

        let hiking = MarketFacts {
            policy_rate: Some(0.25),
            previous_policy_rate: Some(0.1),
            ..Default::default()
        };
        assert_eq!(m.policy_rate(&hiking).unwrap(), PolicyRateState::Tightening);

        let flat = MarketFacts {
            policy_rate_history: vec![4.5, 4.5, 4.5],
            ..Default::default()
        };
        assert_eq!(m.policy_rate(&flat).unwrap(), PolicyRateState::Hold);
    }

    #[test]
    fn test_policy_rate_level_alone_is_unknown() {
        let facts = MarketFacts {
            policy_rate: Some(5.25),
            ..Default::default()
        };
        assert_eq!(
            mapper().map_state(StateFamily::PolicyRate, &facts),
            StateValue::PolicyRate(PolicyRateState::Unknown)
        );
    }

    #[test]
    fn test_employment_prefers_unemployment() {
        let facts = MarketFacts {
            unemployment_rate: Some(2.5),
            employment_rate: Some(80.0),
            ..Default::default()
        };
        assert_eq!(mapper().employment(&facts).unwrap(), EmploymentState::Strong);

        let facts = MarketFacts {
            employment_rate: Some(92.0),
            ..Default::default()
        };
        assert_eq!(mapper().employment(&facts).unwrap(), EmploymentState::Stable);
    }

    #[test]
    fn test_growth_prefers_pmi() {
        let facts = MarketFacts {
            pmi: Some(48.0),
            gdp_growth: Some(4.0),
            ..Default::default()
        };
        assert_eq!(mapper().growth(&facts).unwrap(), GrowthState::Slowdown);

        let facts = MarketFacts {
            gdp_growth: Some(3.5),
            ..Default::default()
        };
        assert_eq!(mapper().growth(&facts).unwrap(), GrowthState::Recovery);
    }

    #[test]
    fn test_long_rate_absolute_and_relative() {
        let m = mapper();
        let at = |rate: f64| {
            m.long_rate(&MarketFacts {
                long_term_rate: Some(rate),
                ..Default::default()
            })
            .unwrap()
        };
        assert_eq!(at(1.0), LongRateState::LowLevel);
        assert_eq!(at(3.0), LongRateState::MidLevel);
        assert_eq!(at(4.5), LongRateState::HighLevel);

        // 1.5% is high against a 1.0% average even though absolutely low
        let facts = MarketFacts {
            long_term_rate: Some(1.5),
            long_term_rate_history: vec![0.9, 1.0, 1.1],
            ..Default::default()
        };
        assert_eq!(m.long_rate(&facts).unwrap(), LongRateState::HighLevel);
    }

    #[test]
    fn test_equity_valuation_from_moving_average() {
        let m = mapper();
        let at = |pct: f64| {
            m.equity_valuation(&MarketFacts {
                price_vs_ma200: Some(pct),
                ..Default::default()
            })
            .unwrap()
        };
        assert_eq!(at(-8.0), EquityValuationState::Cheap);
        assert_eq!(at(0.0), EquityValuationState::Fair);
        assert_eq!(at(12.0), EquityValuationState::HighZone);

        let only_ma20 = MarketFacts {
            price_vs_ma20: Some(6.0),
            ..Default::default()
        };
        assert_eq!(m.equity_valuation(&only_ma20).unwrap(), EquityValuationState::HighZone);
    }

    #[test]
    fn test_equity_valuation_prefers_pe() {
        let facts = MarketFacts {
            pe_ratio: Some(30.0),
            historical_pe: Some(28.0),
            price_vs_ma200: Some(-10.0),
            ..Default::default()
        };
        assert_eq!(mapper().equity_valuation(&facts).unwrap(), EquityValuationState::Fair);
    }

    #[test]
    fn test_volatility_cut_points() {
        let m = mapper();
        let at = |vol: f64| {
            m.volatility(&MarketFacts {
                volatility: Some(vol),
                ..Default::default()
            })
            .unwrap()
        };
        assert_eq!(at(12.0), VolatilityState::Low);
        assert_eq!(at(15.0), VolatilityState::Medium);
        assert_eq!(at(30.0), VolatilityState::Medium);
        assert_eq!(at(31.0), VolatilityState::High);
    }

    #[test]
    fn test_volatility_from_prices() {
        let facts = MarketFacts {
            historical_prices: vec![100.0; 31],
            ..Default::default()
        };
        assert_eq!(mapper().volatility(&facts).unwrap(), VolatilityState::Low);
    }

    #[test]
    fn test_sector_concentration() {
        let m = mapper();
        let ai = MarketFacts {
            ai_sector_weight: Some(0.4),
            top_stocks_concentration: Some(0.5),
            ..Default::default()
        };
        assert_eq!(m.sector_concentration(&ai).unwrap(), SectorConcentrationState::AiHeavy);

        let narrow = MarketFacts {
            top_stocks_concentration: Some(0.4),
            ..Default::default()
        };
        assert_eq!(
            m.sector_concentration(&narrow).unwrap(),
            SectorConcentrationState::SingleThemeHeavy
        );

        let broad = MarketFacts {
            top_stocks_concentration: Some(0.2),
            ai_sector_weight: Some(0.1),
            ..Default::default()
        };
        assert_eq!(m.sector_concentration(&broad).unwrap(), SectorConcentrationState::None);
    }

    #[test]
    fn test_liquidity_spread_then_volume() {
        let m = mapper();
        let wide = MarketFacts {
            credit_spread: Some(3.5),
            volume_ratio: Some(2.0),
            ..Default::default()
        };
        assert_eq!(m.liquidity(&wide).unwrap(), LiquidityState::Tight);

        let busy = MarketFacts {
            volume_ratio: Some(1.8),
            ..Default::default()
        };
        assert_eq!(m.liquidity(&busy).unwrap(), LiquidityState::Loose);
    }

    #[test]
    fn test_external_risk_events_raise_floor() {
        let m = mapper();
        let calm_with_event = MarketFacts {
            vix: Some(12.0),
            geopolitical_events: vec!["strait blockade".to_string()],
            ..Default::default()
        };
        assert_eq!(m.external_risk(&calm_with_event).unwrap(), ExternalRiskState::Medium);

        let panic = MarketFacts {
            vix: Some(35.0),
            geopolitical_events: vec!["conflict".to_string()],
            ..Default::default()
        };
        assert_eq!(m.external_risk(&panic).unwrap(), ExternalRiskState::High);

        let blank_event = MarketFacts {
            geopolitical_events: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(m.external_risk(&blank_event).is_err());
    }

    #[test]
    fn test_map_all_states_is_string_keyed() {
        let facts = MarketFacts {
            pmi: Some(56.0),
            cpi_yoy: Some(2.0),
            ..Default::default()
        };
        let states = mapper().map_all_states(&facts);
        assert_eq!(states["growth"], "recovery");
        assert_eq!(states["inflation"], "moderate");
        assert_eq!(states["volatility"], "unknown");
        assert_eq!(states.len(), StateFamily::ALL.len());
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let facts = MarketFacts {
            cpi_yoy_history: vec![3.0, 3.4],
            policy_rate_history: vec![1.0, 1.25],
            volatility: Some(22.0),
            vix: Some(18.0),
            ..Default::default()
        };
        let m = mapper();
        assert_eq!(m.map_vector(&facts), m.map_vector(&facts));
    }

    #[test]
    fn test_default_thresholds_validate() {
        assert!(Thresholds::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut thresholds = Thresholds::default();
        thresholds.volatility.low_below = 40.0;
        let err = thresholds.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidThreshold { name: "volatility.low_below < high_above", .. }
        ));
    }

    #[test]
    fn test_equal_bounds_only_where_inclusive() {
        let mut thresholds = Thresholds::default();
        thresholds.inflation.reaccelerating_level = thresholds.inflation.moderate_below;
        assert!(thresholds.validate().is_ok());

        thresholds.inflation.low_below = thresholds.inflation.moderate_below;
        assert!(matches!(
            thresholds.validate(),
            Err(ConfigurationError::InvalidThreshold { name: "inflation.low_below < moderate_below", .. })
        ));
    }
}
