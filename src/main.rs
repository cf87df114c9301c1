use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use session_metrics::{PipelineConfig, RunOutcome};

#[derive(Parser)]
#[command(name = "session-metrics")]
#[command(about = "Aggregates program-session spreadsheets into DA completeness metrics", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file (aliases, exclusions, date formats, report names)
    #[arg(long, env = "SESSION_METRICS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory scanned for .xls*/.ods/.csv sources (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory receiving the metrics CSV and chart (overrides config)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.out_dir {
        config.out_dir = dir;
    }

    if let RunOutcome::Empty = session_metrics::run(&config).context("Pipeline failed")? {
        tracing::debug!("Nothing to report, no output written");
    }
    Ok(())
}
