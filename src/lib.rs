//! Deterministic market judgment.
//!
//! Raw indicator facts are mapped to discrete states, states are scored by
//! per-timeframe rule tables into a bounded view with a reasoning trail, and
//! the same states drive thematic sector suggestions.

pub mod analysis;
pub mod config;
pub mod db;
pub mod errors;
pub mod facts;
pub mod judgment;
pub mod monitoring;
pub mod sectors;
pub mod state;
