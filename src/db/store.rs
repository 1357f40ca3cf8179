use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;

use crate::analysis::{AnalysisRun, PairOutcome, PairReport};
use crate::judgment::Timeframe;

/// Audit trail of analysis runs and their per-pair outcomes.
pub struct JudgmentStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub evaluated_at: String,
    pub as_of: Option<String>,
    pub rules_fingerprint: String,
    pub pairs_available: i64,
    pub pairs_unavailable: i64,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JudgmentRecord {
    pub id: Option<i64>,
    pub run_id: String,
    pub market: String,
    pub timeframe: String,
    /// `ok` or `unavailable`.
    pub status: String,
    pub score: Option<i64>,
    pub direction_label: Option<String>,
    pub raw_score: Option<String>,
    /// JSON array of reasons.
    pub reasoning: String,
    /// JSON array of `family:value` strings.
    pub key_states: String,
    /// JSON array of sector suggestions.
    pub sectors: String,
    pub has_risk: bool,
    /// JSON array of event-risk names.
    pub risk_events: String,
    pub error: Option<String>,
    pub evaluated_at: String,
}

impl JudgmentRecord {
    fn from_pair(run: &AnalysisRun, pair: &PairReport) -> Result<Self> {
        let evaluated_at = run.evaluated_at.to_rfc3339();
        let record = match &pair.outcome {
            PairOutcome::Available(result) => Self {
                id: None,
                run_id: run.run_id.to_string(),
                market: pair.market.clone(),
                timeframe: pair.timeframe.to_string(),
                status: "ok".to_string(),
                score: Some(i64::from(result.score)),
                direction_label: Some(result.direction_label.clone()),
                raw_score: Some(result.raw_score.to_string()),
                reasoning: serde_json::to_string(&result.reasoning)
                    .context("Failed to encode reasoning")?,
                key_states: serde_json::to_string(&result.key_states)
                    .context("Failed to encode key states")?,
                sectors: serde_json::to_string(&result.sectors)
                    .context("Failed to encode sectors")?,
                has_risk: result.has_risk,
                risk_events: serde_json::to_string(&result.risk_events)
                    .context("Failed to encode risk events")?,
                error: None,
                evaluated_at,
            },
            PairOutcome::Unavailable { error } => Self {
                id: None,
                run_id: run.run_id.to_string(),
                market: pair.market.clone(),
                timeframe: pair.timeframe.to_string(),
                status: "unavailable".to_string(),
                score: None,
                direction_label: None,
                raw_score: None,
                reasoning: "[]".to_string(),
                key_states: "[]".to_string(),
                sectors: "[]".to_string(),
                has_risk: false,
                risk_events: "[]".to_string(),
                error: Some(error.clone()),
                evaluated_at,
            },
        };
        Ok(record)
    }

    /// Decoded reasoning list.
    pub fn reasons(&self) -> Result<Vec<String>> {
        serde_json::from_str(&self.reasoning).context("Stored reasoning is not a JSON array")
    }
}

impl JudgmentStore {
    pub async fn new(database_path: &str) -> Result<Self> {
        let in_memory = database_path == ":memory:";
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{database_path}"))
            .context("Invalid database path")?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // Every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        let migration_sql = include_str!("../../migrations/001_init.sql");
        // sqlx executes one statement per call
        for statement in migration_statements(migration_sql) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute migration: {statement}"))?;
        }
        Ok(())
    }

    /// Persist a run and every pair outcome atomically.
    pub async fn record_run(&self, run: &AnalysisRun) -> Result<()> {
        let records = run
            .pairs
            .iter()
            .map(|pair| JudgmentRecord::from_pair(run, pair))
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        sqlx::query(
            "INSERT INTO runs (run_id, evaluated_at, as_of, rules_fingerprint, pairs_available, pairs_unavailable)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(run.run_id.to_string())
        .bind(run.evaluated_at.to_rfc3339())
        .bind(run.as_of.map(|t| t.to_rfc3339()))
        .bind(&run.rules_fingerprint)
        .bind(run.available() as i64)
        .bind(run.unavailable() as i64)
        .execute(&mut *tx)
        .await
        .context("Failed to insert run")?;

        for record in &records {
            sqlx::query(
                "INSERT INTO judgments (run_id, market, timeframe, status, score, direction_label, raw_score, reasoning, key_states, sectors, has_risk, risk_events, error, evaluated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.run_id)
            .bind(&record.market)
            .bind(&record.timeframe)
            .bind(&record.status)
            .bind(record.score)
            .bind(&record.direction_label)
            .bind(&record.raw_score)
            .bind(&record.reasoning)
            .bind(&record.key_states)
            .bind(&record.sectors)
            .bind(record.has_risk)
            .bind(&record.risk_events)
            .bind(&record.error)
            .bind(&record.evaluated_at)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "Failed to insert judgment for {} {}",
                    record.market, record.timeframe
                )
            })?;
        }

        tx.commit().await.context("Failed to commit run")?;
        Ok(())
    }

    /// Most recent judgments for one pair, newest first.
    pub async fn recent_judgments(
        &self,
        market: &str,
        timeframe: Timeframe,
        limit: i64,
    ) -> Result<Vec<JudgmentRecord>> {
        let records = sqlx::query_as::<_, JudgmentRecord>(
            "SELECT * FROM judgments WHERE market = ? AND timeframe = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(market)
        .bind(timeframe.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent judgments")?;
        Ok(records)
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let run = sqlx::query_as::<_, RunRecord>("SELECT * FROM runs WHERE run_id = ?")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch run")?;
        Ok(run)
    }

    pub async fn get_run_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM runs")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count runs")?;
        Ok(row.0)
    }
}

/// Split a migration script into statements. `--` comments are dropped
/// first so a `;` inside one cannot cut a statement short.
fn migration_statements(sql: &str) -> Vec<String> {
    let stripped: String = sql
        .lines()
        .map(|line| line.split_once("--").map_or(line, |(code, _)| code))
        .collect::<Vec<_>>()
        .join("\n");
    stripped
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
