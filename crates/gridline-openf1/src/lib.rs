//! gridline-openf1 - OpenF1 telemetry import pipeline
//!
//! Ingests race sessions, drivers, laps, and finishing positions from the
//! OpenF1 API and persists them idempotently, skipping the run entirely
//! when no newer session exists upstream.

pub mod api;
pub mod gate;
pub mod import;
pub mod model;
pub mod parse;

pub use api::Endpoints;
pub use gate::StalenessGate;
pub use import::{Importer, ImporterConfig, RunStatus, Stores};
pub use model::{Driver, Lap, LatestSession, Position, Race};
