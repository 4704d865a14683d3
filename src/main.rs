//! # trap-vision
//!
//! Command-line front end for the `trap_vision` engine. Reading history for the
//! `forecast` and `trend` commands comes from a JSON store snapshot; all output
//! is pretty-printed JSON on stdout, logs go to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trap_vision::core_modules::heat_stress::MicroclimateInput;
use trap_vision::core_modules::trend::{TrendKind, TrendScope};
use trap_vision::parallel_pipeline::SegmentationPool;
use trap_vision::store::MemoryStore;
use trap_vision::{AppConfig, TrapAnalyzer};

#[derive(Parser, Debug)]
#[command(name = "trap-vision", version, about = "Sticky-trap pest counting and risk scoring")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = trap_vision::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count blobs in one or more trap photos and classify the pest amount.
    Analyze {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Score heat stress from four microclimate readings.
    Heat {
        #[arg(long)]
        air_temperature: String,
        #[arg(long)]
        soil_temperature: String,
        #[arg(long)]
        soil_moisture: String,
        #[arg(long)]
        relative_humidity: String,
    },
    /// Forecast one grower's pest risk from their reading history.
    Forecast {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long)]
        area: String,
    },
    /// Summarize the community trend for an area.
    Trend {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        area: String,
        #[arg(long, value_enum, default_value_t = KindArg::Pest)]
        kind: KindArg,
        #[arg(long, value_enum, default_value_t = ScopeArg::Recent)]
        scope: ScopeArg,
        /// Reference time (RFC 3339) for the 24-hour activity window; defaults to now.
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum KindArg {
    Pest,
    Heat,
}

impl From<KindArg> for TrendKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Pest => TrendKind::Pest,
            KindArg::Heat => TrendKind::Heat,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ScopeArg {
    /// The latest 50 community rows.
    Recent,
    /// The latest 100 community rows.
    All,
}

impl From<ScopeArg> for TrendScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Recent => TrendScope::Recent,
            ScopeArg::All => TrendScope::All,
        }
    }
}

#[derive(Serialize)]
struct ImageOutcome<T: Serialize> {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_path(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let analyzer = TrapAnalyzer::new(config);
    match cli.command {
        Command::Analyze { images } => analyze(&analyzer, images).await,
        Command::Heat {
            air_temperature,
            soil_temperature,
            soil_moisture,
            relative_humidity,
        } => {
            let input = MicroclimateInput::from_fields(
                &air_temperature,
                &soil_temperature,
                &soil_moisture,
                &relative_humidity,
            )?;
            print_json(&analyzer.score_heat_stress(&input)?)
        }
        Command::Forecast { store, user, area } => {
            let store = load_store(&store)?;
            print_json(&analyzer.forecast_individual_risk(&store, &user, &area)?)
        }
        Command::Trend {
            store,
            area,
            kind,
            scope,
            now,
        } => {
            let store = load_store(&store)?;
            let now = now.unwrap_or_else(Utc::now);
            let trend =
                analyzer.aggregate_community_trend(&store, &area, kind.into(), scope.into(), now);
            print_json(&trend)
        }
    }
}

async fn analyze(analyzer: &TrapAnalyzer, paths: Vec<PathBuf>) -> Result<()> {
    let mut images = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        images.push(bytes);
    }

    let worker_count = analyzer.config().workers.resolved_count().min(paths.len());
    info!(images = paths.len(), workers = worker_count, "segmenting trap images");
    let pool = SegmentationPool::new(analyzer.config().segmenter, worker_count);
    let results = pool.segment_batch(images).await;
    pool.shutdown().await;

    let outcomes: Vec<_> = paths
        .into_iter()
        .zip(results)
        .map(|(path, result)| match result {
            Ok(analysis) => ImageOutcome {
                path,
                result: Some(analyzer.classify_analysis(analysis)),
                error: None,
            },
            Err(err) => ImageOutcome {
                path,
                result: None,
                error: Some(err.to_string()),
            },
        })
        .collect();
    print_json(&outcomes)
}

fn load_store(path: &Path) -> Result<MemoryStore> {
    MemoryStore::from_json_file(path)
        .with_context(|| format!("loading store snapshot {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_arguments_map_to_engine_types() {
        let cli = Cli::try_parse_from([
            "trap-vision",
            "trend",
            "--store",
            "readings.json",
            "--area",
            "KE",
            "--kind",
            "heat",
            "--scope",
            "all",
        ])
        .unwrap();
        match cli.command {
            Command::Trend { kind, scope, now, .. } => {
                assert_eq!(TrendKind::from(kind), TrendKind::Heat);
                assert_eq!(TrendScope::from(scope), TrendScope::All);
                assert!(now.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_path_defaults_to_working_directory_file() {
        let cli = Cli::try_parse_from(["trap-vision", "analyze", "trap.png"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(trap_vision::config::DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn trend_defaults_to_recent_pest() {
        let cli =
            Cli::try_parse_from(["trap-vision", "trend", "--store", "s.json", "--area", "KE"])
                .unwrap();
        match cli.command {
            Command::Trend { kind, scope, .. } => {
                assert_eq!(TrendKind::from(kind), TrendKind::Pest);
                assert_eq!(TrendScope::from(scope), TrendScope::Recent);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
