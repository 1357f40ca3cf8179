//! Declarative rule records.
//!
//! A rule table is an ordered list of `(condition, delta, reason)` records.
//! Tables are validated once from configuration into typed values; after
//! that, evaluation cannot meet an unknown family or state string.

use rust_decimal::Decimal;

use crate::config::{JudgmentConfig, RuleConfig};
use crate::errors::ConfigurationError;
use crate::judgment::Timeframe;
use crate::state::{StateFamily, StateValue, StateVector};

/// Largest magnitude a single rule may move the raw score.
pub const MAX_RULE_DELTA: f64 = 100.0;

/// A conjunction of `family = state` clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    clauses: Vec<StateValue>,
}

impl Condition {
    pub fn new(clauses: Vec<StateValue>) -> Self {
        Self { clauses }
    }

    /// Parse raw `family -> state` clauses from configuration.
    pub fn parse<'a, I>(raw: I, location: &str) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut clauses = Vec::new();
        for (family, state) in raw {
            let family: StateFamily =
                family
                    .parse()
                    .map_err(|source| ConfigurationError::InvalidState {
                        location: location.to_string(),
                        source,
                    })?;
            let value = StateValue::parse(family, state).map_err(|source| {
                ConfigurationError::InvalidState {
                    location: location.to_string(),
                    source,
                }
            })?;
            if value.is_unknown() {
                return Err(ConfigurationError::ConditionOnUnknown {
                    location: location.to_string(),
                    family: family.key().to_string(),
                });
            }
            clauses.push(value);
        }

        if clauses.is_empty() {
            return Err(ConfigurationError::EmptyCondition {
                location: location.to_string(),
            });
        }
        Ok(Self { clauses })
    }

    /// True when every clause holds.
    pub fn matches(&self, states: &StateVector) -> bool {
        self.clauses.iter().all(|clause| states.matches(*clause))
    }

    pub fn clauses(&self) -> &[StateValue] {
        &self.clauses
    }

    /// Families this condition reads.
    pub fn families(&self) -> impl Iterator<Item = StateFamily> + '_ {
        self.clauses.iter().map(|clause| clause.family())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub condition: Condition,
    pub delta: Decimal,
    pub reason: String,
}

impl Rule {
    fn from_config(raw: &RuleConfig, location: &str) -> Result<Self, ConfigurationError> {
        let condition = Condition::parse(&raw.when, location)?;

        if !raw.delta.is_finite() || raw.delta.abs() > MAX_RULE_DELTA {
            return Err(ConfigurationError::InvalidDelta {
                location: location.to_string(),
                value: raw.delta,
            });
        }
        // Round-trip through the shortest decimal text so 0.1 stays 0.1
        let delta = raw
            .delta
            .to_string()
            .parse::<Decimal>()
            .map_err(|_| ConfigurationError::InvalidDelta {
                location: location.to_string(),
                value: raw.delta,
            })?;

        let reason = raw.reason.trim();
        if reason.is_empty() {
            return Err(ConfigurationError::EmptyReason {
                location: location.to_string(),
            });
        }

        Ok(Self {
            condition,
            delta,
            reason: reason.to_string(),
        })
    }
}

/// The ordered rules for one timeframe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    timeframe: Timeframe,
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(timeframe: Timeframe, rules: Vec<Rule>) -> Self {
        Self { timeframe, rules }
    }

    pub fn from_config(
        timeframe: Timeframe,
        raw: &[RuleConfig],
    ) -> Result<Self, ConfigurationError> {
        if raw.is_empty() {
            return Err(ConfigurationError::MissingRuleTable(timeframe.to_string()));
        }

        let rules = raw
            .iter()
            .enumerate()
            .map(|(idx, rule)| Rule::from_config(rule, &format!("judgment.{timeframe}[{idx}]")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { timeframe, rules })
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Every family any rule in this table reads, in canonical order.
    pub fn referenced_families(&self) -> Vec<StateFamily> {
        let mut families: Vec<StateFamily> = self
            .rules
            .iter()
            .flat_map(|rule| rule.condition.families())
            .collect();
        families.sort();
        families.dedup();
        families
    }
}

/// One validated table per timeframe. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBook {
    short: RuleTable,
    medium: RuleTable,
    long: RuleTable,
}

impl RuleBook {
    pub fn from_config(config: &JudgmentConfig) -> Result<Self, ConfigurationError> {
        Ok(Self {
            short: RuleTable::from_config(Timeframe::Short, &config.short)?,
            medium: RuleTable::from_config(Timeframe::Medium, &config.medium)?,
            long: RuleTable::from_config(Timeframe::Long, &config.long)?,
        })
    }

    pub fn table(&self, timeframe: Timeframe) -> &RuleTable {
        match timeframe {
            Timeframe::Short => &self.short,
            Timeframe::Medium => &self.medium,
            Timeframe::Long => &self.long,
        }
    }

    pub fn rule_count(&self) -> usize {
        Timeframe::ALL
            .iter()
            .map(|tf| self.table(*tf).rules().len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::AppConfig;
    use crate::errors::InvalidStateError;
    use crate::state::{GrowthState, InflationState, PolicyRateState};

    fn rule(when: &[(&str, &str)], delta: f64, reason: &str) -> RuleConfig {
        RuleConfig {
            when: when
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            delta,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_default_rule_book_validates() {
        let config = AppConfig::builtin().unwrap();
        let book = RuleBook::from_config(&config.judgment).unwrap();
        assert_eq!(book.table(Timeframe::Short).rules().len(), 10);
        assert_eq!(book.table(Timeframe::Medium).rules().len(), 9);
        assert_eq!(book.table(Timeframe::Long).rules().len(), 9);
        assert_eq!(book.rule_count(), 28);
    }

    #[test]
    fn test_half_point_deltas_are_exact() {
        let table =
            RuleTable::from_config(Timeframe::Short, &[rule(&[("volatility", "low")], 0.5, "calm")])
                .unwrap();
        assert_eq!(table.rules()[0].delta, dec!(0.5));
    }

    #[test]
    fn test_compound_condition_requires_all_clauses() {
        let condition = Condition::parse(
            &BTreeMap::from([
                ("inflation".to_string(), "high_sticky".to_string()),
                ("policy_rate".to_string(), "tightening".to_string()),
            ]),
            "test",
        )
        .unwrap();

        let only_inflation =
            StateVector::default().with(StateValue::Inflation(InflationState::HighSticky));
        assert!(!condition.matches(&only_inflation));

        let both = only_inflation.with(StateValue::PolicyRate(PolicyRateState::Tightening));
        assert!(condition.matches(&both));
    }

    #[test]
    fn test_empty_table_is_missing() {
        let err = RuleTable::from_config(Timeframe::Medium, &[]).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingRuleTable("medium".to_string()));
    }

    #[test]
    fn test_empty_condition_rejected() {
        let err = RuleTable::from_config(Timeframe::Long, &[rule(&[], 1.0, "always")]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::EmptyCondition {
                location: "judgment.long[0]".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_family_rejected() {
        let err = RuleTable::from_config(Timeframe::Short, &[rule(&[("weather", "sunny")], 1.0, "x")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidState {
                source: InvalidStateError::UnknownFamily(_),
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_state_value_rejected() {
        let err = RuleTable::from_config(Timeframe::Short, &[rule(&[("growth", "boom")], 1.0, "x")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidState {
                source: InvalidStateError::UnknownValue { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_condition_on_unknown_rejected() {
        let err =
            RuleTable::from_config(Timeframe::Short, &[rule(&[("growth", "unknown")], -1.0, "x")])
                .unwrap_err();
        assert!(matches!(err, ConfigurationError::ConditionOnUnknown { .. }));
    }

    #[test]
    fn test_non_finite_delta_rejected() {
        let err = RuleTable::from_config(
            Timeframe::Short,
            &[rule(&[("growth", "recovery")], f64::NAN, "x")],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDelta { .. }));
    }

    #[test]
    fn test_out_of_range_delta_rejected() {
        for delta in [5e28, -101.0] {
            let err = RuleTable::from_config(
                Timeframe::Short,
                &[rule(&[("growth", "recovery")], delta, "x")],
            )
            .unwrap_err();
            assert!(matches!(err, ConfigurationError::InvalidDelta { .. }));
        }

        let table = RuleTable::from_config(
            Timeframe::Short,
            &[rule(&[("growth", "recovery")], -MAX_RULE_DELTA, "x")],
        )
        .unwrap();
        assert_eq!(table.rules()[0].delta, dec!(-100));
    }

    #[test]
    fn test_blank_reason_rejected() {
        let err =
            RuleTable::from_config(Timeframe::Short, &[rule(&[("growth", "recovery")], 1.0, "  ")])
                .unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyReason { .. }));
    }

    #[test]
    fn test_referenced_families() {
        let table = RuleTable::from_config(
            Timeframe::Long,
            &[
                rule(&[("growth", "recovery")], 1.0, "a"),
                rule(&[("inflation", "moderate")], 0.5, "b"),
                rule(&[("growth", "slowdown")], -1.0, "c"),
            ],
        )
        .unwrap();
        assert_eq!(
            table.referenced_families(),
            vec![StateFamily::Inflation, StateFamily::Growth]
        );
        assert!(table.rules()[0]
            .condition
            .clauses()
            .contains(&StateValue::Growth(GrowthState::Recovery)));
    }
}
