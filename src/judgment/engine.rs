//! Market judgment: one generic interpreter over the per-timeframe rule tables.
//!
//! Every rule in the table is visited; every rule whose condition holds adds
//! its delta and its reason. The sum is rounded half away from zero, clamped
//! to [-2, 2] and bucketed into a `MarketView` by the integer alone.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::errors::InvalidStateError;
use crate::judgment::rules::{RuleBook, RuleTable};
use crate::judgment::{Judgment, MarketView, Timeframe};
use crate::state::StateVector;

pub const MIN_SCORE: i8 = -2;
pub const MAX_SCORE: i8 = 2;

/// Sum of fired deltas plus the reasons, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub raw_score: Decimal,
    pub reasoning: Vec<String>,
}

/// Fire every applicable rule. No short-circuiting.
pub fn evaluate(table: &RuleTable, states: &StateVector) -> Evaluation {
    let mut raw_score = Decimal::ZERO;
    let mut reasoning = Vec::new();

    for rule in table.rules() {
        if rule.condition.matches(states) {
            raw_score = raw_score.saturating_add(rule.delta);
            reasoning.push(rule.reason.clone());
        }
    }

    Evaluation {
        raw_score,
        reasoning,
    }
}

/// Round half away from zero, then clamp to [-2, 2].
pub fn round_and_clamp(raw_score: Decimal) -> i8 {
    let rounded = raw_score.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let clamped = rounded.clamp(Decimal::from(MIN_SCORE), Decimal::from(MAX_SCORE));
    // Cannot fail after the clamp
    clamped.to_i8().unwrap_or(0)
}

/// Holds the validated rule book; cheap to clone and share across tasks.
#[derive(Debug, Clone)]
pub struct MarketJudge {
    rules: Arc<RuleBook>,
}

impl MarketJudge {
    pub fn new(rules: Arc<RuleBook>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Judge a typed state vector for one timeframe.
    pub fn judge(&self, states: &StateVector, timeframe: Timeframe) -> Judgment {
        let Evaluation {
            raw_score,
            reasoning,
        } = evaluate(self.rules.table(timeframe), states);
        let score = round_and_clamp(raw_score);
        let view = MarketView::from_score(score);

        debug!(
            timeframe = %timeframe,
            raw_score = %raw_score,
            score,
            view = %view,
            fired = reasoning.len(),
            "Judgment computed"
        );

        Judgment {
            timeframe,
            view,
            score,
            raw_score,
            reasoning,
            key_states: states.key_states(),
        }
    }

    /// Judge a string-keyed state vector.
    ///
    /// Missing families read as `unknown`; a value outside its family's
    /// enumeration or an unrecognized timeframe is an `InvalidStateError`.
    pub fn judge_market_view(
        &self,
        states: &BTreeMap<String, String>,
        timeframe: &str,
    ) -> Result<Judgment, InvalidStateError> {
        let timeframe: Timeframe = timeframe.parse()?;
        let vector = StateVector::from_wire(states)?;
        Ok(self.judge(&vector, timeframe))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::AppConfig;
    use crate::state::{StateFamily, StateValue};

    fn judge() -> MarketJudge {
        let config = AppConfig::builtin().unwrap();
        MarketJudge::new(Arc::new(RuleBook::from_config(&config.judgment).unwrap()))
    }

    fn wire(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_rounding_boundaries() {
        assert_eq!(round_and_clamp(dec!(-1.5)), -2);
        assert_eq!(round_and_clamp(dec!(-0.5)), -1);
        assert_eq!(round_and_clamp(dec!(0.5)), 1);
        assert_eq!(round_and_clamp(dec!(1.5)), 2);
        assert_eq!(round_and_clamp(dec!(0.4)), 0);
        assert_eq!(round_and_clamp(dec!(-0.4)), 0);
        assert_eq!(round_and_clamp(dec!(0)), 0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(round_and_clamp(dec!(3.5)), 2);
        assert_eq!(round_and_clamp(dec!(-4)), -2);
        assert_eq!(round_and_clamp(dec!(2.49)), 2);
    }

    #[test]
    fn test_huge_deltas_saturate_instead_of_overflowing() {
        use crate::judgment::rules::{Condition, Rule};

        let always = |reason: &str| Rule {
            condition: Condition::new(vec![]),
            delta: Decimal::MAX,
            reason: reason.to_string(),
        };
        let table = RuleTable::new(Timeframe::Long, vec![always("a"), always("b")]);

        let evaluation = evaluate(&table, &StateVector::default());
        assert_eq!(evaluation.raw_score, Decimal::MAX);
        assert_eq!(evaluation.reasoning, vec!["a", "b"]);
        assert_eq!(round_and_clamp(evaluation.raw_score), MAX_SCORE);
    }

    #[test]
    fn test_short_term_bearish_scenario() {
        let states = wire(&[
            ("inflation", "high_sticky"),
            ("policy_rate", "tightening"),
            ("long_rate", "high_level"),
            ("equity_valuation", "high_zone"),
            ("volatility", "high"),
            ("liquidity", "tight"),
        ]);
        let judgment = judge().judge_market_view(&states, "short").unwrap();

        assert_eq!(judgment.score, -2);
        assert_eq!(judgment.view, MarketView::StrongBearish);
        assert_eq!(judgment.direction_label(), "strong_bearish");
        assert_eq!(judgment.raw_score, dec!(-3.5));
        assert_eq!(judgment.reasoning[0], "インフレ高止まりと金融引き締めが同時発生");
        assert!(judgment.reasoning.len() >= 5);
    }

    #[test]
    fn test_long_term_bullish_scenario() {
        let states = wire(&[
            ("growth", "recovery"),
            ("sector_concentration", "none"),
            ("external_risk", "low"),
            ("inflation", "moderate"),
        ]);
        let judgment = judge().judge_market_view(&states, "long").unwrap();

        assert_eq!(judgment.score, 2);
        assert_eq!(judgment.view, MarketView::StrongBullish);
        assert_eq!(judgment.raw_score, dec!(3));
        assert_eq!(judgment.reasoning.len(), 4);
    }

    #[test]
    fn test_ai_concentration_is_positive_long_term() {
        let states = wire(&[("sector_concentration", "ai_heavy")]);
        let judgment = judge().judge_market_view(&states, "long").unwrap();
        assert_eq!(judgment.raw_score, dec!(0.5));
        assert_eq!(judgment.score, 1);

        let states = wire(&[("sector_concentration", "single_theme_heavy")]);
        let judgment = judge().judge_market_view(&states, "long").unwrap();
        assert_eq!(judgment.score, -1);
    }

    #[test]
    fn test_neutral_baseline_every_timeframe() {
        let judge = judge();
        for timeframe in Timeframe::ALL {
            let judgment = judge.judge(&StateVector::default(), timeframe);
            assert_eq!(judgment.score, 0, "{timeframe}");
            assert_eq!(judgment.direction_label(), "neutral");
            assert!(judgment.reasoning.is_empty());
        }
    }

    #[test]
    fn test_empty_wire_vector_is_neutral() {
        let judgment = judge().judge_market_view(&BTreeMap::new(), "medium").unwrap();
        assert_eq!(judgment.view, MarketView::Neutral);
        assert_eq!(judgment.key_states.len(), StateFamily::ALL.len());
    }

    #[test]
    fn test_invalid_state_fails_fast() {
        let states = wire(&[("growth", "booming")]);
        let err = judge().judge_market_view(&states, "short").unwrap_err();
        assert!(matches!(err, InvalidStateError::UnknownValue { .. }));
    }

    #[test]
    fn test_invalid_timeframe() {
        let err = judge().judge_market_view(&BTreeMap::new(), "decade").unwrap_err();
        assert_eq!(err, InvalidStateError::UnknownTimeframe("decade".to_string()));
    }

    #[test]
    fn test_judgment_is_deterministic() {
        let judge = judge();
        let states = wire(&[
            ("growth", "slowdown"),
            ("employment", "weak"),
            ("equity_valuation", "high_zone"),
            ("liquidity", "loose"),
        ]);
        let first = judge.judge_market_view(&states, "medium").unwrap();
        let second = judge.judge_market_view(&states, "medium").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.raw_score, dec!(-1.5));
        assert_eq!(first.score, -2);
    }

    #[test]
    fn test_score_bounded_over_every_referenced_combination() {
        let judge = judge();
        for timeframe in Timeframe::ALL {
            let families = judge.rules().table(timeframe).referenced_families();

            // Cartesian product over the families this table reads
            let mut vectors = vec![StateVector::default()];
            for family in families {
                let values: Vec<StateValue> = family.all_values();
                vectors = vectors
                    .iter()
                    .flat_map(|base| values.iter().map(move |v| base.with(*v)))
                    .collect();
            }

            for states in &vectors {
                let judgment = judge.judge(states, timeframe);
                assert!((MIN_SCORE..=MAX_SCORE).contains(&judgment.score));
                assert_eq!(judgment.view, MarketView::from_score(judgment.score));
            }
        }
    }
}
