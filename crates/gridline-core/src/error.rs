//! Per-unit error taxonomy for fetch-and-parse work units.

use crate::fetch::FetchError;

/// Why a single fetch unit yielded no records.
///
/// A unit error is terminal for its unit only: the fan-out records it and
/// the surrounding stage keeps going with whatever the sibling units
/// produced. Validation drops are deliberately *not* represented here —
/// an invalid record is discarded at debug level, not reported as an error.
#[derive(Debug)]
pub enum UnitError {
    /// The bounded retry budget was spent entirely on HTTP 429 responses.
    RetriesExhausted,
    /// Terminal non-200/429 status.
    Status(u16),
    /// Network-level failure (never retried).
    Transport(String),
    /// The response body was not the expected JSON array.
    Malformed(String),
}

impl std::fmt::Display for UnitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RetriesExhausted => write!(f, "rate limited, retries exhausted"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for UnitError {}

impl From<FetchError> for UnitError {
    fn from(e: FetchError) -> Self {
        Self::Transport(e.to_string())
    }
}
