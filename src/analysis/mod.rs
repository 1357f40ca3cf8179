//! Analysis run orchestration.
//!
//! Fans out over the configured market × timeframe grid. Each market is
//! fetched once; a provider failure or a bad state override marks only that
//! market's pairs unavailable and the run carries on.

pub mod events;
pub mod report;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::analysis::events::{check_event_risks, EventConfig, EventRisk};
use crate::config::AppConfig;
use crate::errors::InvalidStateError;
use crate::facts::{FactProvider, MarketSpec};
use crate::judgment::engine::MarketJudge;
use crate::judgment::rules::RuleBook;
use crate::judgment::{Judgment, MarketView, Timeframe};
use crate::sectors::recommender::SectorRecommender;
use crate::sectors::themes::ThemeTable;
use crate::sectors::SectorSuggestion;
use crate::state::mapper::StateMapper;
use crate::state::{StateFamily, StateValue, StateVector};

/// Judgment plus sector suggestions for one (market, timeframe) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairResult {
    pub score: i8,
    pub direction_label: String,
    pub view: MarketView,
    pub raw_score: Decimal,
    pub reasoning: Vec<String>,
    pub key_states: Vec<String>,
    pub sectors: Vec<SectorSuggestion>,
    /// True when any event-risk check fired for the market.
    pub has_risk: bool,
    pub risk_events: Vec<EventRisk>,
}

impl PairResult {
    fn new(judgment: Judgment, sectors: Vec<SectorSuggestion>, risk_events: Vec<EventRisk>) -> Self {
        Self {
            score: judgment.score,
            direction_label: judgment.direction_label().to_string(),
            view: judgment.view,
            raw_score: judgment.raw_score,
            reasoning: judgment.reasoning,
            key_states: judgment.key_states,
            sectors,
            has_risk: !risk_events.is_empty(),
            risk_events,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PairOutcome {
    #[serde(rename = "ok")]
    Available(PairResult),
    Unavailable { error: String },
}

impl PairOutcome {
    pub fn result(&self) -> Option<&PairResult> {
        match self {
            Self::Available(result) => Some(result),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub market: String,
    pub market_name: String,
    pub timeframe: Timeframe,
    #[serde(flatten)]
    pub outcome: PairOutcome,
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRun {
    pub run_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    /// Latest observation time reported by the fact provider.
    pub as_of: Option<DateTime<Utc>>,
    pub rules_fingerprint: String,
    pub pairs: Vec<PairReport>,
}

impl AnalysisRun {
    pub fn available(&self) -> usize {
        self.pairs.iter().filter(|p| p.outcome.is_available()).count()
    }

    pub fn unavailable(&self) -> usize {
        self.pairs.len() - self.available()
    }

    /// Evaluated pairs carrying an event-risk flag.
    pub fn at_risk(&self) -> usize {
        self.pairs
            .iter()
            .filter_map(|p| p.outcome.result())
            .filter(|r| r.has_risk)
            .count()
    }

    pub fn pair(&self, market: &str, timeframe: Timeframe) -> Option<&PairReport> {
        self.pairs
            .iter()
            .find(|p| p.market == market && p.timeframe == timeframe)
    }
}

/// The validated engine: mapper, judge and recommender built once from
/// configuration and shared read-only for the life of the process.
#[derive(Debug, Clone)]
pub struct Analyzer {
    mapper: StateMapper,
    events: EventConfig,
    judge: MarketJudge,
    recommender: SectorRecommender,
    markets: Vec<MarketSpec>,
    timeframes: Vec<Timeframe>,
    fingerprint: String,
}

impl Analyzer {
    /// Validate thresholds, rule tables and themes. Any `ConfigurationError`
    /// is fatal here, before a single evaluation.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config
            .thresholds
            .validate()
            .context("Invalid state mapper thresholds")?;
        config
            .events
            .validate()
            .context("Invalid event-risk checks")?;
        let rules = RuleBook::from_config(&config.judgment).context("Invalid judgment rule tables")?;
        let themes = ThemeTable::from_config(&config.themes).context("Invalid sector theme table")?;
        let fingerprint = config.rules_fingerprint()?;

        info!(
            rules = rules.rule_count(),
            themes = themes.len(),
            markets = config.analysis.markets.len(),
            fingerprint = %fingerprint,
            "Judgment engine configured"
        );

        Ok(Self {
            mapper: StateMapper::new(config.thresholds.clone()),
            events: config.events.clone(),
            judge: MarketJudge::new(Arc::new(rules)),
            recommender: SectorRecommender::new(Arc::new(themes)),
            markets: config.analysis.markets.clone(),
            timeframes: config.analysis.timeframes.clone(),
            fingerprint,
        })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn markets(&self) -> &[MarketSpec] {
        &self.markets
    }

    pub fn mapper(&self) -> &StateMapper {
        &self.mapper
    }

    pub fn judge(&self) -> &MarketJudge {
        &self.judge
    }

    pub fn recommender(&self) -> &SectorRecommender {
        &self.recommender
    }

    /// Judgment and sectors for one state vector. Pure; `risk_events` are
    /// carried through and never touch the score.
    pub fn evaluate(
        &self,
        states: &StateVector,
        risk_events: &[EventRisk],
        timeframe: Timeframe,
    ) -> PairResult {
        let judgment = self.judge.judge(states, timeframe);
        let sectors = self.recommender.recommend_sectors(states, timeframe);
        PairResult::new(judgment, sectors, risk_events.to_vec())
    }

    /// Run the full grid against a fact provider.
    #[instrument(skip_all, fields(provider = provider.name()))]
    pub async fn run(&self, provider: &dyn FactProvider) -> AnalysisRun {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let evaluated_at = Utc::now();
        let mut as_of: Option<DateTime<Utc>> = None;
        let mut pairs = Vec::with_capacity(self.markets.len() * self.timeframes.len());

        for market in &self.markets {
            match self.market_states(provider, market).await {
                Ok(MarketStates {
                    states,
                    risk_events,
                    as_of: observed,
                }) => {
                    as_of = as_of.max(observed);
                    let unknown = states.unknown_families();
                    if !unknown.is_empty() {
                        info!(
                            market = %market.code,
                            unknown = ?unknown.iter().map(|f| f.key()).collect::<Vec<_>>(),
                            "Some families have no usable facts"
                        );
                    }
                    if !risk_events.is_empty() {
                        warn!(
                            market = %market.code,
                            events = ?risk_events,
                            "Event risk detected"
                        );
                    }
                    for &timeframe in &self.timeframes {
                        let result = self.evaluate(&states, &risk_events, timeframe);
                        info!(
                            market = %market.code,
                            timeframe = %timeframe,
                            score = result.score,
                            view = %result.view,
                            sectors = result.sectors.len(),
                            has_risk = result.has_risk,
                            "Pair evaluated"
                        );
                        pairs.push(PairReport {
                            market: market.code.clone(),
                            market_name: market.name.clone(),
                            timeframe,
                            outcome: PairOutcome::Available(result),
                        });
                    }
                }
                Err(e) => {
                    warn!(market = %market.code, error = %format!("{e:#}"), "Market unavailable");
                    for &timeframe in &self.timeframes {
                        pairs.push(PairReport {
                            market: market.code.clone(),
                            market_name: market.name.clone(),
                            timeframe,
                            outcome: PairOutcome::Unavailable {
                                error: format!("{e:#}"),
                            },
                        });
                    }
                }
            }
        }

        let run = AnalysisRun {
            run_id,
            evaluated_at,
            as_of,
            rules_fingerprint: self.fingerprint.clone(),
            pairs,
        };

        info!(
            run_id = %run.run_id,
            available = run.available(),
            unavailable = run.unavailable(),
            at_risk = run.at_risk(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Analysis run complete"
        );

        run
    }

    async fn market_states(
        &self,
        provider: &dyn FactProvider,
        market: &MarketSpec,
    ) -> Result<MarketStates> {
        let snapshot = provider
            .fetch(market)
            .await
            .with_context(|| format!("{} failed for market {}", provider.name(), market.code))?;

        let mut states = self.mapper.map_vector(&snapshot.facts);
        apply_overrides(&mut states, &snapshot.state_overrides)
            .with_context(|| format!("Invalid state override for market {}", market.code))?;

        Ok(MarketStates {
            states,
            risk_events: check_event_risks(&self.events, &snapshot.facts),
            as_of: snapshot.as_of,
        })
    }
}

/// One market's inputs to the timeframe fan-out.
struct MarketStates {
    states: StateVector,
    risk_events: Vec<EventRisk>,
    as_of: Option<DateTime<Utc>>,
}

/// Pin families to analyst-supplied states.
///
/// Unrecognized family keys are skipped with a warning; an unrecognized
/// value for a known family is an error.
pub fn apply_overrides(
    states: &mut StateVector,
    overrides: &BTreeMap<String, String>,
) -> Result<(), InvalidStateError> {
    for (key, value) in overrides {
        let Ok(family) = key.parse::<StateFamily>() else {
            warn!(family = %key, "Ignoring override for unrecognized state family");
            continue;
        };
        states.set(StateValue::parse(family, value)?);
    }
    Ok(())
}
