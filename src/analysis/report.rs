//! Plain-text rendering of an analysis run for the terminal.

use std::fmt;

use crate::analysis::{AnalysisRun, PairOutcome, PairReport};

impl fmt::Display for AnalysisRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Market Judgment ===")?;
        writeln!(
            f,
            "Run: {} | Evaluated: {} | Data as of: {}",
            self.run_id,
            self.evaluated_at.format("%Y-%m-%d %H:%M UTC"),
            self.as_of
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        )?;
        writeln!(f, "Rules: {}", &self.rules_fingerprint[..self.rules_fingerprint.len().min(12)])?;

        let mut current_market: Option<&str> = None;
        for pair in &self.pairs {
            if current_market != Some(pair.market.as_str()) {
                writeln!(f)?;
                writeln!(f, "--- {} ({}) ---", pair.market_name, pair.market)?;
                current_market = Some(pair.market.as_str());
            }
            write!(f, "{pair}")?;
        }

        write!(
            f,
            "\n{} pairs evaluated, {} unavailable, {} with event risk",
            self.available(),
            self.unavailable(),
            self.at_risk()
        )
    }
}

impl fmt::Display for PairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match &self.outcome {
            PairOutcome::Available(result) => result,
            PairOutcome::Unavailable { error } => {
                return writeln!(f, "[{}] unavailable: {error}", self.timeframe);
            }
        };

        writeln!(
            f,
            "[{}] {} {} (score {:+}, raw {})",
            self.timeframe,
            result.view.arrow(),
            result.direction_label,
            result.score,
            result.raw_score,
        )?;
        if result.has_risk {
            let events: Vec<&str> = result.risk_events.iter().map(|e| e.as_str()).collect();
            writeln!(f, "    ! event risk: {}", events.join(", "))?;
        }
        for reason in &result.reasoning {
            writeln!(f, "    - {reason}")?;
        }
        if !result.sectors.is_empty() {
            let sectors: Vec<String> = result
                .sectors
                .iter()
                .map(|s| format!("{} ({})", s.name, s.trend))
                .collect();
            writeln!(f, "    sectors: {}", sectors.join(", "))?;
        }
        Ok(())
    }
}
