//! Error taxonomy for the judgment core.
//!
//! Plumbing code (file I/O, SQLite, CLI) uses `anyhow`; these typed errors
//! are what the core itself can produce.

use thiserror::Error;

/// A state string that is not a member of its family's enumeration.
///
/// Raised at the wire boundary, never deep inside rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidStateError {
    #[error("invalid state '{value}' for family '{family}'")]
    UnknownValue { family: String, value: String },

    #[error("unknown state family '{0}'")]
    UnknownFamily(String),

    #[error("invalid timeframe '{0}' (expected short, medium or long)")]
    UnknownTimeframe(String),
}

/// A malformed rule, theme or threshold table. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("rule table for timeframe '{0}' is missing or empty")]
    MissingRuleTable(String),

    #[error("{location}: condition has no clauses")]
    EmptyCondition { location: String },

    #[error("{location}: {source}")]
    InvalidState {
        location: String,
        #[source]
        source: InvalidStateError,
    },

    #[error("{location}: conditions may not reference the unknown state of '{family}'")]
    ConditionOnUnknown { location: String, family: String },

    #[error("{location}: delta must be finite and no larger than 100 in magnitude, got {value}")]
    InvalidDelta { location: String, value: f64 },

    #[error("{location}: reason text is empty")]
    EmptyReason { location: String },

    #[error("theme '{0}' is defined more than once")]
    DuplicateTheme(String),

    #[error("theme '{name}' is missing required key '{key}'")]
    IncompleteTheme { name: String, key: &'static str },

    #[error("threshold '{name}' is invalid: {detail}")]
    InvalidThreshold { name: &'static str, detail: String },
}

/// A metric a family needs was not supplied by the fact provider.
///
/// Only ever constructed inside the state mapper, where it is logged and
/// recovered to the family's `unknown` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no usable '{metric}' fact for family '{family}'")]
pub struct MissingFactError {
    pub family: &'static str,
    pub metric: &'static str,
}
