//! Theme definitions and the static theme → sector table.

use std::collections::HashSet;

use crate::config::ThemeConfig;
use crate::errors::ConfigurationError;
use crate::judgment::rules::Condition;
use crate::state::StateVector;

/// One theme: when it fires, and which sectors it expands into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeDefinition {
    pub name: String,
    pub reason: String,
    /// The theme is active when any trigger matches.
    pub triggers: Vec<Condition>,
    pub primary: Vec<String>,
    pub spillover: Vec<String>,
    pub related: Vec<String>,
}

impl ThemeDefinition {
    pub fn is_active(&self, states: &StateVector) -> bool {
        self.triggers.iter().any(|trigger| trigger.matches(states))
    }

    fn from_config(raw: &ThemeConfig) -> Result<Self, ConfigurationError> {
        let name = raw.name.trim();
        if name.is_empty() {
            return Err(ConfigurationError::IncompleteTheme {
                name: raw.name.clone(),
                key: "name",
            });
        }
        let incomplete = |key| ConfigurationError::IncompleteTheme {
            name: name.to_string(),
            key,
        };

        if raw.reason.trim().is_empty() {
            return Err(incomplete("reason"));
        }
        if raw.triggers.is_empty() {
            return Err(incomplete("triggers"));
        }
        if raw.primary.is_empty() {
            return Err(incomplete("primary"));
        }

        let triggers = raw
            .triggers
            .iter()
            .enumerate()
            .map(|(idx, trigger)| Condition::parse(trigger, &format!("themes.{name}.triggers[{idx}]")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            reason: raw.reason.trim().to_string(),
            triggers,
            primary: raw.primary.clone(),
            spillover: raw.spillover.clone(),
            related: raw.related.clone(),
        })
    }
}

/// Themes in evaluation order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeTable {
    themes: Vec<ThemeDefinition>,
}

impl ThemeTable {
    pub fn from_config(raw: &[ThemeConfig]) -> Result<Self, ConfigurationError> {
        let mut seen = HashSet::new();
        let mut themes = Vec::with_capacity(raw.len());

        for theme in raw {
            let definition = ThemeDefinition::from_config(theme)?;
            if !seen.insert(definition.name.clone()) {
                return Err(ConfigurationError::DuplicateTheme(definition.name));
            }
            themes.push(definition);
        }

        Ok(Self { themes })
    }

    pub fn themes(&self) -> &[ThemeDefinition] {
        &self.themes
    }

    pub fn get(&self, name: &str) -> Option<&ThemeDefinition> {
        self.themes.iter().find(|theme| theme.name == name)
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}
