//! Snapshot file fact provider.
//!
//! Reads a JSON document holding the latest facts for every market, the
//! same shape the upstream fetch jobs write as their fallback cache:
//!
//! ```json
//! { "as_of": "2026-10-17T00:00:00Z",
//!   "markets": { "US": { "facts": { "PMI": 52.1 }, "state_overrides": {} } } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::facts::{FactProvider, MarketFacts, MarketSnapshot, MarketSpec};

#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    markets: BTreeMap<String, MarketEntry>,
}

#[derive(Debug, Deserialize)]
struct MarketEntry {
    #[serde(default)]
    facts: MarketFacts,
    #[serde(default)]
    state_overrides: BTreeMap<String, String>,
    /// Per-market observation time, overriding the document's.
    #[serde(default)]
    as_of: Option<DateTime<Utc>>,
}

pub struct SnapshotFactProvider {
    path: PathBuf,
}

impl SnapshotFactProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<SnapshotDocument> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read fact snapshot: {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse fact snapshot: {}", self.path.display()))
    }
}

#[async_trait]
impl FactProvider for SnapshotFactProvider {
    async fn fetch(&self, market: &MarketSpec) -> Result<MarketSnapshot> {
        let mut document = self.load().await?;

        let Some(entry) = document.markets.remove(&market.code) else {
            warn!(
                market = %market.code,
                path = %self.path.display(),
                "Market absent from snapshot, every family will read as unknown"
            );
            return Ok(MarketSnapshot {
                as_of: document.as_of,
                ..Default::default()
            });
        };

        debug!(
            market = %market.code,
            overrides = entry.state_overrides.len(),
            "Loaded market facts from snapshot"
        );

        Ok(MarketSnapshot {
            facts: entry.facts,
            state_overrides: entry.state_overrides,
            as_of: entry.as_of.or(document.as_of),
        })
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}
