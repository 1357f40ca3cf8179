use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use market_judgment::analysis::{AnalysisRun, Analyzer};
use market_judgment::config::AppConfig;
use market_judgment::db::store::JudgmentStore;
use market_judgment::facts::snapshot::SnapshotFactProvider;
use market_judgment::judgment::Timeframe;
use market_judgment::monitoring::logger;

#[derive(Parser)]
#[command(name = "market-judgment")]
#[command(about = "Rule-based market direction judgment and sector themes")]
struct Cli {
    /// Path to the TOML configuration
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every configured market and timeframe
    Run {
        /// Print the run as JSON instead of the text report
        #[arg(long)]
        json: bool,
        /// Skip writing the run to the audit store
        #[arg(long)]
        no_store: bool,
    },
    /// Show stored judgments for one market and timeframe
    History {
        #[arg(short, long)]
        market: String,
        #[arg(short, long)]
        timeframe: Timeframe,
        #[arg(short, long, default_value_t = 10)]
        limit: i64,
    },
    /// Validate thresholds, rule tables and themes
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    logger::init_logging(&config.monitoring)?;

    match cli.command {
        Commands::Run { json, no_store } => run(&config, json, no_store).await,
        Commands::History {
            market,
            timeframe,
            limit,
        } => history(&config, &market, timeframe, limit).await,
        Commands::CheckConfig => check_config(&config),
    }
}

async fn run(config: &AppConfig, json: bool, no_store: bool) -> Result<()> {
    let analyzer = Analyzer::from_config(config)?;
    let provider = SnapshotFactProvider::new(&config.facts.snapshot_path);

    tracing::info!(
        snapshot = %config.facts.snapshot_path,
        markets = analyzer.markets().len(),
        "Market judgment starting"
    );

    let run = analyzer.run(&provider).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&run).context("Failed to encode run as JSON")?
        );
    } else {
        println!("\n{run}");
    }

    if run.unavailable() > 0 {
        tracing::warn!(
            unavailable = run.unavailable(),
            "Some pairs could not be evaluated"
        );
    }

    // The report is already out; a store failure only costs the audit row
    if config.database.enabled && !no_store {
        if let Err(e) = record(config, &run).await {
            tracing::warn!(
                run_id = %run.run_id,
                path = %config.database.path,
                error = %format!("{e:#}"),
                "Failed to record run"
            );
        }
    }

    Ok(())
}

async fn record(config: &AppConfig, run: &AnalysisRun) -> Result<()> {
    let store = JudgmentStore::new(&config.database.path).await?;
    store.record_run(run).await?;
    tracing::info!(run_id = %run.run_id, path = %config.database.path, "Run recorded");
    Ok(())
}

async fn history(config: &AppConfig, market: &str, timeframe: Timeframe, limit: i64) -> Result<()> {
    let store = JudgmentStore::new(&config.database.path).await?;
    let records = store.recent_judgments(market, timeframe, limit).await?;

    if records.is_empty() {
        println!("No stored judgments for {market} {timeframe}");
        return Ok(());
    }

    for record in records {
        match (record.score, record.direction_label.as_deref()) {
            (Some(score), Some(label)) => {
                println!("{} {:+} {label}", record.evaluated_at, score);
                for reason in record.reasons()? {
                    println!("    - {reason}");
                }
            }
            _ => println!(
                "{} unavailable: {}",
                record.evaluated_at,
                record.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    let analyzer = Analyzer::from_config(config)?;
    let rules = analyzer.judge().rules();

    for timeframe in Timeframe::ALL {
        println!("{timeframe}: {} rules", rules.table(timeframe).rules().len());
    }
    println!("themes: {}", config.themes.len());
    println!("fingerprint: {}", analyzer.fingerprint());

    Ok(())
}
