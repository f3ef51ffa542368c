//! Emergency map ingest (emap-ingest) - Main entry point
//!
//! Runs one reconciliation pass of a dispatch feed document against the
//! incident store, or prints the stored incidents of a day.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emap_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use emap_ingest::config::resolve_geocode_api_key;
use emap_ingest::db::{self, SqliteIncidentRepository, SqliteResourceRepository};
use emap_ingest::geocode::HttpGeocodeClient;
use emap_ingest::query::IncidentQuery;
use emap_ingest::{IncidentStatus, ReconciliationEngine};

/// Batch phase as given on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Phase {
    Open,
    Closed,
}

impl From<Phase> for IncidentStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Open => IncidentStatus::Open,
            Phase::Closed => IncidentStatus::Closed,
        }
    }
}

/// Command-line arguments for emap-ingest
#[derive(Parser, Debug)]
#[command(name = "emap-ingest")]
#[command(about = "Reconciles emergency dispatch feeds into the incident store")]
#[command(version)]
struct Args {
    /// Feed document (JSON) to reconcile
    #[arg(short, long, required_unless_present = "list")]
    feed: Option<PathBuf>,

    /// Status the whole feed batch represents
    #[arg(short, long, value_enum, required_unless_present = "list")]
    phase: Option<Phase>,

    /// Print the stored incidents of a day (YYYY-MM-DD) as JSON and exit
    #[arg(long, conflicts_with_all = ["feed", "phase"])]
    list: Option<NaiveDate>,

    /// Bootstrap config file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(short, long, env = "EMAP_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let (config, config_source) = TomlConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("emap_ingest={0},emap_common={0}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config_source.is_default() {
        warn!("Configuration: {}", config_source);
    } else {
        info!("Configuration: {}", config_source);
    }

    let db_path = args.database.clone().unwrap_or_else(|| config.database_path());
    info!("Database: {}", db_path.display());

    let pool = db::init_database_pool(&db_path)
        .await
        .context("Failed to open incident database")?;

    let incidents = Arc::new(SqliteIncidentRepository::new(pool.clone()));

    if let Some(date) = args.list {
        let resources = Arc::new(SqliteResourceRepository::new(pool.clone()));
        let views = IncidentQuery::new(incidents, resources)
            .incidents_for_date(date)
            .await
            .with_context(|| format!("Failed to list incidents for {}", date))?;
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    let (Some(feed_path), Some(phase)) = (args.feed, args.phase) else {
        anyhow::bail!("--feed and --phase are required unless --list is given");
    };
    let phase = IncidentStatus::from(phase);

    let api_key = resolve_geocode_api_key(&pool, &config)
        .await
        .context("Failed to resolve geocode API key")?;
    let geocoder = Arc::new(
        HttpGeocodeClient::new(&config.geocode, api_key).context("Failed to build geocode client")?,
    );

    let engine = ReconciliationEngine::new(geocoder, incidents);

    let raw = tokio::fs::read(&feed_path)
        .await
        .with_context(|| format!("Failed to read feed {}", feed_path.display()))?;

    info!("Reconciling {} as {} batch", feed_path.display(), phase);
    let outcome = engine
        .reconcile(&raw, phase)
        .await
        .with_context(|| format!("Feed {} rejected", feed_path.display()))?;

    for err in &outcome.errors {
        if err.is_degraded_only() {
            warn!("{}", err);
        } else {
            error!("{}", err);
        }
    }

    info!(
        "Done: {} reconciled ({} created, {} closed, {} unchanged), {} record errors",
        outcome.incidents.len(),
        outcome.stats.created,
        outcome.stats.closed,
        outcome.stats.unchanged,
        outcome.errors.len()
    );

    pool.close().await;
    Ok(())
}
