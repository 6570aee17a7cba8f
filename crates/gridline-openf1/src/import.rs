//! Stage-sequenced import orchestration.
//!
//! Stages run strictly in order — Races, Drivers, Laps, Positions, marker
//! update — because each fan-out is keyed by identifiers the previous
//! stage fetched and persisted. Every stage upserts its batch before the
//! next begins, so a run that dies mid-way leaves earlier stages durably
//! imported and simply re-imports on the next pass.

use std::sync::Arc;

use anyhow::Context;

use gridline_core::{fan_out, fetch_with_backoff, FanOutReport, Fetcher, RetryPolicy};
use gridline_store::Repository;

use crate::api::Endpoints;
use crate::gate::StalenessGate;
use crate::model::{Driver, Lap, LatestSession, Position, Race, LATEST_SESSION_ID};
use crate::parse;

/// Per-entity repositories the pipeline persists into.
pub struct Stores<'a> {
    pub races: &'a dyn Repository<Race>,
    pub drivers: &'a dyn Repository<Driver>,
    pub laps: &'a dyn Repository<Lap>,
    pub positions: &'a dyn Repository<Position>,
    pub markers: &'a dyn Repository<LatestSession>,
}

/// Tuning knobs for one import pass.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub endpoints: Endpoints,
    pub policy: RetryPolicy,
    /// Concurrency ceiling for each fan-out stage.
    pub concurrency: usize,
    /// Race-query lower bound when no marker exists yet (yyyy-mm-dd).
    pub fallback_start_date: String,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            policy: RetryPolicy::default(),
            concurrency: 3,
            fallback_start_date: "2024-01-01".to_string(),
        }
    }
}

/// How a run resolved. Failures are logged, not propagated: the trigger
/// learns nothing beyond this status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The marker matched the API's latest session; nothing was fetched
    /// or persisted.
    SkippedUpToDate,
    /// All stages completed and the marker was updated. Individual fetch
    /// units may still have been abandoned along the way.
    Completed,
    /// A stage-level error ended the run early. Stages persisted before
    /// the error stay persisted; the marker was not touched.
    Failed,
}

/// Output of the race stage, required input to the driver stage.
#[derive(Debug)]
pub struct RaceStage {
    pub races: Vec<Race>,
}

/// Output of the driver stage, required input to lap and position stages.
#[derive(Debug)]
pub struct DriverStage {
    pub drivers: Vec<Driver>,
}

#[derive(Debug)]
pub struct LapStage {
    pub laps: Vec<Lap>,
}

#[derive(Debug)]
pub struct PositionStage {
    pub positions: Vec<Position>,
}

/// One fan-out work key: a session paired with a driver number.
#[derive(Debug, Clone, Copy)]
struct SessionDriver {
    session_key: i64,
    driver_number: i64,
}

impl std::fmt::Display for SessionDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session {} driver {}", self.session_key, self.driver_number)
    }
}

pub struct Importer<'a> {
    fetcher: Arc<dyn Fetcher>,
    config: ImporterConfig,
    stores: Stores<'a>,
}

impl<'a> Importer<'a> {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: ImporterConfig, stores: Stores<'a>) -> Self {
        Self {
            fetcher,
            config,
            stores,
        }
    }

    fn gate(&self) -> StalenessGate<'_> {
        StalenessGate::new(
            self.fetcher.as_ref(),
            &self.config.policy,
            &self.config.endpoints,
            self.stores.markers,
        )
    }

    /// Execute one import pass. Stage-level errors are caught here,
    /// logged, and end the run early without propagating.
    pub async fn run(&self, force: bool) -> RunStatus {
        match self.try_run(force).await {
            Ok(status) => status,
            Err(e) => {
                log::error!("import run failed: {e:#}");
                RunStatus::Failed
            }
        }
    }

    async fn try_run(&self, force: bool) -> anyhow::Result<RunStatus> {
        let gate = self.gate();
        if !force && !gate.is_import_needed().await? {
            log::info!("no new session upstream, data is up to date");
            return Ok(RunStatus::SkippedUpToDate);
        }

        log::info!("new session found, beginning import");
        let races = self.import_races().await?;
        let drivers = self.import_drivers(&races).await?;
        let laps = self.import_laps(&races, &drivers).await?;
        let positions = self.import_positions(&races, &drivers).await?;

        // Marker only moves once every stage completed; abandoned fetch
        // units within a stage do not block it.
        gate.update_marker().await?;

        log::info!(
            "import complete: {} races, {} drivers, {} laps, {} positions",
            races.races.len(),
            drivers.drivers.len(),
            laps.laps.len(),
            positions.positions.len()
        );
        Ok(RunStatus::Completed)
    }

    /// Stage 1: a single filtered call for race sessions newer than the
    /// marker's end date (or the fallback epoch on first run).
    pub async fn import_races(&self) -> anyhow::Result<RaceStage> {
        let lower_bound = self
            .stores
            .markers
            .find_by_id(LATEST_SESSION_ID)
            .context("failed to read import marker")?
            .map(|m| m.session_end_date)
            .unwrap_or_else(|| self.config.fallback_start_date.clone());

        let url = self.config.endpoints.races_since(&lower_bound);
        let body = fetch_with_backoff(self.fetcher.as_ref(), &self.config.policy, &url)
            .await
            .context("failed to fetch races")?;
        let races = parse::parse_races(&body).context("failed to parse races")?;

        if !races.is_empty() {
            self.stores
                .races
                .save_all(&races)
                .context("failed to persist races")?;
        }
        log::info!("{} races imported (since {lower_bound})", races.len());
        Ok(RaceStage { races })
    }

    /// Stage 2: one fetch unit per race session.
    pub async fn import_drivers(&self, races: &RaceStage) -> anyhow::Result<DriverStage> {
        let session_keys: Vec<i64> = races.races.iter().map(|r| r.session_key).collect();
        let total = session_keys.len();

        let fetcher = Arc::clone(&self.fetcher);
        let endpoints = self.config.endpoints.clone();
        let policy = self.config.policy.clone();
        let report = fan_out(session_keys, self.config.concurrency, move |session_key| {
            let fetcher = Arc::clone(&fetcher);
            let endpoints = endpoints.clone();
            let policy = policy.clone();
            async move {
                let url = endpoints.drivers(session_key);
                let body = fetch_with_backoff(fetcher.as_ref(), &policy, &url).await?;
                parse::parse_drivers(&body)
            }
        })
        .await;

        if !report.records.is_empty() {
            self.stores
                .drivers
                .save_all(&report.records)
                .context("failed to persist drivers")?;
        }
        log_stage("drivers", &report, total);
        Ok(DriverStage {
            drivers: report.records,
        })
    }

    /// Stage 3: one fetch unit per (session, driver) pair.
    pub async fn import_laps(
        &self,
        races: &RaceStage,
        drivers: &DriverStage,
    ) -> anyhow::Result<LapStage> {
        let pairs = session_driver_pairs(races, drivers);
        let total = pairs.len();

        let fetcher = Arc::clone(&self.fetcher);
        let endpoints = self.config.endpoints.clone();
        let policy = self.config.policy.clone();
        let report = fan_out(pairs, self.config.concurrency, move |pair: SessionDriver| {
            let fetcher = Arc::clone(&fetcher);
            let endpoints = endpoints.clone();
            let policy = policy.clone();
            async move {
                let url = endpoints.laps(pair.session_key, pair.driver_number);
                let body = fetch_with_backoff(fetcher.as_ref(), &policy, &url).await?;
                parse::parse_laps(&body, pair.session_key, pair.driver_number)
            }
        })
        .await;

        if !report.records.is_empty() {
            self.stores
                .laps
                .save_all(&report.records)
                .context("failed to persist laps")?;
        }
        log_stage("laps", &report, total);
        Ok(LapStage {
            laps: report.records,
        })
    }

    /// Stage 4: one fetch unit per (session, driver) pair; each yields at
    /// most one final-position record.
    pub async fn import_positions(
        &self,
        races: &RaceStage,
        drivers: &DriverStage,
    ) -> anyhow::Result<PositionStage> {
        let pairs = session_driver_pairs(races, drivers);
        let total = pairs.len();

        let fetcher = Arc::clone(&self.fetcher);
        let endpoints = self.config.endpoints.clone();
        let policy = self.config.policy.clone();
        let report = fan_out(pairs, self.config.concurrency, move |pair: SessionDriver| {
            let fetcher = Arc::clone(&fetcher);
            let endpoints = endpoints.clone();
            let policy = policy.clone();
            async move {
                let url = endpoints.positions(pair.session_key, pair.driver_number);
                let body = fetch_with_backoff(fetcher.as_ref(), &policy, &url).await?;
                let position =
                    parse::parse_final_position(&body, pair.session_key, pair.driver_number)?;
                Ok(position.into_iter().collect())
            }
        })
        .await;

        if !report.records.is_empty() {
            self.stores
                .positions
                .save_all(&report.records)
                .context("failed to persist positions")?;
        }
        log_stage("positions", &report, total);
        Ok(PositionStage {
            positions: report.records,
        })
    }
}

/// Every (session, driver) combination, with duplicate driver numbers
/// collapsed (the same driver shows up in most sessions).
fn session_driver_pairs(races: &RaceStage, drivers: &DriverStage) -> Vec<SessionDriver> {
    let mut numbers: Vec<i64> = drivers.drivers.iter().map(|d| d.driver_number).collect();
    numbers.sort_unstable();
    numbers.dedup();

    races
        .races
        .iter()
        .flat_map(|race| {
            numbers.iter().map(move |&driver_number| SessionDriver {
                session_key: race.session_key,
                driver_number,
            })
        })
        .collect()
}

fn log_stage<T>(stage: &str, report: &FanOutReport<T>, total_units: usize) {
    if report.is_clean() {
        log::info!(
            "{} {stage} imported from {total_units} units",
            report.records.len()
        );
    } else {
        log::warn!(
            "{} {stage} imported from {total_units} units ({} units yielded nothing)",
            report.records.len(),
            report.failures.len()
        );
    }
}
