//! `gridpulse`: fetch, merge and summarize daily weather against electricity demand.
//!
//! Commands:
//! - `fetch`: pull weather and demand for every city and save the raw files
//! - `process`: merge the raw files and write the quality report
//! - `analyze`: build the summary tables from the merged file
//! - `run`: all of the above in one go

use chrono::Utc;
use clap::{Parser, Subcommand};
use gridpulse::{
    analyze_stored, default_cities, process_stored, FetchMode, OutputStore, Pipeline,
    PipelineConfig, PipelineError, ReportMode, DATA_DIR,
};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "gridpulse",
    about = "Daily weather vs. electricity demand for five US cities"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Fetch mode: `history` (last 90 days) or `daily` (latest day). Overrides FETCH_MODE.
    #[arg(long, global = true)]
    mode: Option<FetchMode>,

    /// Data directory. Overrides GRIDPULSE_DATA_DIR; defaults to ./data.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Write one combined quality report instead of one per city.
    #[arg(long, global = true, default_value_t = false)]
    aggregate_report: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch weather and demand and save the raw per-city files.
    Fetch,
    /// Merge saved raw files and write the quality report.
    Process,
    /// Build summary tables from the saved merged file.
    Analyze,
    /// Fetch, process and analyze.
    Run,
}

impl Cli {
    fn report_mode(&self) -> ReportMode {
        if self.aggregate_report {
            ReportMode::Aggregate
        } else {
            ReportMode::PerCity
        }
    }

    /// Data directory for the offline stages, which need no API keys.
    fn offline_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| std::env::var(DATA_DIR).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    fn online_config(&self) -> Result<PipelineConfig, PipelineError> {
        let mut config = PipelineConfig::from_env()?;
        if let Some(mode) = self.mode {
            config.fetch_mode = mode;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        config.report_mode = self.report_mode();
        Ok(config)
    }
}

async fn execute(cli: &Cli) -> Result<(), PipelineError> {
    match cli.command {
        Commands::Fetch => {
            let pipeline = Pipeline::from_config(cli.online_config()?)?;
            let fetched = pipeline.fetch().await?;
            info!(
                "Fetch complete: {} weather and {} energy records",
                fetched.weather.len(),
                fetched.energy.len()
            );
        }
        Commands::Process => {
            dotenvy::dotenv().ok();
            let store = OutputStore::new(cli.offline_data_dir());
            let today = Utc::now().date_naive();
            let processed = process_stored(&store, &default_cities(), cli.report_mode(), today)?;
            info!(
                "Processing complete: {} merged rows saved to {}",
                processed.merged.height(),
                store.merged_path().display()
            );
        }
        Commands::Analyze => {
            dotenvy::dotenv().ok();
            let store = OutputStore::new(cli.offline_data_dir());
            analyze_stored(&store)?;
            info!(
                "Analysis complete. Results saved to {}",
                store.processed_dir().display()
            );
        }
        Commands::Run => {
            let pipeline = Pipeline::from_config(cli.online_config()?)?;
            let summary = pipeline.run().await?;
            info!(
                "Run complete: {} merged rows, {} quality report(s)",
                summary.merged_rows,
                summary.quality.len()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match execute(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("gridpulse failed: {}", e);
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
