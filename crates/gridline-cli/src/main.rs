//! gridline - OpenF1 telemetry importer
//!
//! Pulls race sessions, drivers, laps, and finishing positions from the
//! OpenF1 API into local JSON document collections, skipping runs when
//! the local data already covers the latest session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use gridline_core::{HttpFetcher, RetryPolicy};
use gridline_openf1::{
    Driver, Endpoints, Importer, ImporterConfig, Lap, LatestSession, Position, Race, RunStatus,
    Stores,
};
use gridline_store::JsonStore;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "gridline")]
#[command(about = "OpenF1 telemetry importer")]
#[command(version)]
struct Cli {
    /// Config file path (default: ./gridline.toml)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Concurrent fetch ceiling per stage
    #[arg(long)]
    concurrency: Option<usize>,

    /// Fetch attempts per unit before giving up on rate limiting
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Directory holding the JSON document collections
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,

    /// Import even when the latest session is already recorded locally
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    gridline_core::init_logging(cli.debug);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // Config file defaults, CLI overrides
    let base_url = cli.base_url.unwrap_or(config.api.base_url);
    let data_dir = cli.data_dir.unwrap_or(config.store.data_dir);
    let importer_config = ImporterConfig {
        endpoints: Endpoints::new(&base_url),
        policy: RetryPolicy {
            max_attempts: cli.max_attempts.unwrap_or(config.import.max_attempts),
            base_delay: Duration::from_millis(config.import.base_delay_ms),
        },
        concurrency: cli.concurrency.unwrap_or(config.import.concurrency),
        fallback_start_date: config.import.fallback_start_date,
    };

    let races: JsonStore<Race> = JsonStore::open(&data_dir)?;
    let drivers: JsonStore<Driver> = JsonStore::open(&data_dir)?;
    let laps: JsonStore<Lap> = JsonStore::open(&data_dir)?;
    let positions: JsonStore<Position> = JsonStore::open(&data_dir)?;
    let markers: JsonStore<LatestSession> = JsonStore::open(&data_dir)?;
    let stores = Stores {
        races: &races,
        drivers: &drivers,
        laps: &laps,
        positions: &positions,
        markers: &markers,
    };

    let fetcher = Arc::new(HttpFetcher::new().map_err(anyhow::Error::new)?);
    let importer = Importer::new(fetcher, importer_config, stores);

    // Failures are logged inside the run; the process still exits cleanly
    // so schedulers don't retry-storm a flaky upstream.
    match importer.run(cli.force).await {
        RunStatus::SkippedUpToDate => log::info!("nothing to do"),
        RunStatus::Completed => log::info!("import finished"),
        RunStatus::Failed => log::warn!("import ended early, see errors above"),
    }
    Ok(())
}
