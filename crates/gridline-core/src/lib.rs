//! gridline-core - Common infrastructure for telemetry import pipelines
//!
//! This crate provides the transport-level building blocks shared by the
//! import stages: rate-limit-aware HTTP fetching, bounded exponential
//! backoff, and a concurrency-capped fan-out engine.

pub mod error;
pub mod fanout;
pub mod fetch;
pub mod logging;
pub mod retry;

// Re-exports for convenience
pub use error::UnitError;
pub use fanout::{fan_out, FanOutReport};
pub use fetch::{FetchError, FetchOutcome, Fetcher, HttpFetcher};
pub use logging::init_logging;
pub use retry::{fetch_with_backoff, RetryPolicy};
