use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::events::EventConfig;
use crate::facts::MarketSpec;
use crate::judgment::Timeframe;
use crate::state::mapper::Thresholds;

/// The shipped configuration, embedded so the engine can be built without
/// touching the filesystem.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub facts: FactsConfig,
    pub monitoring: MonitoringConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub events: EventConfig,
    #[serde(default)]
    pub judgment: JudgmentConfig,
    #[serde(default)]
    pub themes: Vec<ThemeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub markets: Vec<MarketSpec>,
    #[serde(default = "all_timeframes")]
    pub timeframes: Vec<Timeframe>,
}

fn all_timeframes() -> Vec<Timeframe> {
    Timeframe::ALL.to_vec()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactsConfig {
    pub snapshot_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    #[serde(default = "default_true")]
    pub json_logs: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub enabled: bool,
    pub path: String,
}

/// Rule tables as written in the config file, one list per timeframe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgmentConfig {
    pub short: Vec<RuleConfig>,
    pub medium: Vec<RuleConfig>,
    pub long: Vec<RuleConfig>,
}

/// One rule: when every `family = state` clause holds, add `delta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub when: BTreeMap<String, String>,
    pub delta: f64,
    #[serde(default)]
    pub reason: String,
}

/// One theme and its sector expansion. A theme is active when any trigger
/// matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub triggers: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub spillover: Vec<String>,
    #[serde(default)]
    pub related: Vec<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file, overlaying path overrides from
    /// the environment (`MARKET_FACTS_PATH`, `DATABASE_PATH`).
    pub fn load(config_path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        config.apply_env_overrides();

        Ok(config)
    }

    /// The embedded default configuration.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(DEFAULT_CONFIG).context("Failed to parse embedded default config")
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MARKET_FACTS_PATH") {
            self.facts.snapshot_path = path;
        }
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.database.path = path;
        }
    }

    /// SHA-256 over the thresholds, event checks, rule tables and theme table.
    ///
    /// Stored with every audited run so a judgment can be traced back to
    /// the exact rules that produced it.
    pub fn rules_fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_string(&(
            &self.thresholds,
            &self.events,
            &self.judgment,
            &self.themes,
        ))
            .context("Failed to serialize rule tables for fingerprinting")?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(format!("{digest:x}"))
    }
}
