use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::errors::InvalidStateError;
use crate::judgment::Timeframe;
use crate::sectors::themes::{ThemeDefinition, ThemeTable};
use crate::sectors::{SectorSuggestion, Theme, Trend};
use crate::state::StateVector;

/// Maximum number of suggestions returned per evaluation.
pub const MAX_SUGGESTIONS: usize = 3;

/// Expands active themes into deduplicated sector suggestions.
#[derive(Debug, Clone)]
pub struct SectorRecommender {
    themes: Arc<ThemeTable>,
}

impl SectorRecommender {
    pub fn new(themes: Arc<ThemeTable>) -> Self {
        Self { themes }
    }

    /// Definitions whose triggers hold, in table order.
    fn active_themes<'a>(
        &'a self,
        states: &'a StateVector,
    ) -> impl Iterator<Item = &'a ThemeDefinition> + 'a {
        self.themes
            .themes()
            .iter()
            .filter(move |definition| definition.is_active(states))
    }

    /// Active themes in table order.
    pub fn identify_themes(&self, states: &StateVector) -> Vec<Theme> {
        self.active_themes(states)
            .map(|definition| Theme {
                name: definition.name.clone(),
                reason: definition.reason.clone(),
            })
            .collect()
    }

    /// Suggestions for one timeframe, at most [`MAX_SUGGESTIONS`].
    ///
    /// A sector produced by several themes appears once, at its first-seen
    /// position. A strong (primary) entry displaces an earlier moderate one;
    /// the first strong entry is kept.
    pub fn recommend_sectors(
        &self,
        states: &StateVector,
        timeframe: Timeframe,
    ) -> Vec<SectorSuggestion> {
        let mut ordered: Vec<SectorSuggestion> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut themes = 0usize;

        for definition in self.active_themes(states) {
            themes += 1;
            for candidate in expand(definition, timeframe) {
                match index.get(&candidate.name) {
                    Some(&pos) => {
                        if ordered[pos].trend == Trend::Moderate && candidate.trend == Trend::Strong {
                            ordered[pos] = candidate;
                        }
                    }
                    None => {
                        index.insert(candidate.name.clone(), ordered.len());
                        ordered.push(candidate);
                    }
                }
            }
        }

        debug!(
            timeframe = %timeframe,
            themes,
            candidates = ordered.len(),
            "Sector suggestions computed"
        );

        ordered.truncate(MAX_SUGGESTIONS);
        ordered
    }

    /// String-keyed variant for external consumers.
    pub fn recommend_sectors_wire(
        &self,
        states: &BTreeMap<String, String>,
        timeframe: &str,
    ) -> Result<Vec<SectorSuggestion>, InvalidStateError> {
        let timeframe: Timeframe = timeframe.parse()?;
        let vector = StateVector::from_wire(states)?;
        Ok(self.recommend_sectors(&vector, timeframe))
    }
}

/// Primary sectors first, then spillover.
fn expand(definition: &ThemeDefinition, timeframe: Timeframe) -> Vec<SectorSuggestion> {
    let primary = definition.primary.iter().map(|name| SectorSuggestion {
        name: name.clone(),
        theme: definition.name.clone(),
        reason: definition.reason.clone(),
        related_fields: definition.spillover.clone(),
        timeframe,
        trend: Trend::Strong,
    });
    let spillover = definition.spillover.iter().map(|name| SectorSuggestion {
        name: name.clone(),
        theme: definition.name.clone(),
        reason: format!("{}の波及効果", definition.reason),
        related_fields: definition.related.clone(),
        timeframe,
        trend: Trend::Moderate,
    });
    primary.chain(spillover).collect()
}
