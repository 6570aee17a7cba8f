//! Persistence boundary: keyed documents and upsert-by-key repositories.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record with a deterministic primary key.
///
/// The key is a pure function of the record's identity fields, so two
/// records describing the same entity always collide onto one stored
/// document and re-import overwrites instead of duplicating.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync {
    /// Collection the document lives in.
    const COLLECTION: &'static str;

    fn key(&self) -> String;
}

/// Failure inside a store implementation.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "store IO: {e}"),
            Self::Serde(e) => write!(f, "store encoding: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e)
    }
}

/// Upsert-by-key document collection.
///
/// `save` and `save_all` insert or overwrite by key; `save_all` is
/// all-or-nothing per call from the caller's perspective. Each call is
/// atomic on its own — no transaction spans multiple calls.
pub trait Repository<T: Document>: Send + Sync {
    fn find_all(&self) -> Result<Vec<T>, StoreError>;
    fn find_by_id(&self, key: &str) -> Result<Option<T>, StoreError>;
    fn save(&self, doc: &T) -> Result<(), StoreError>;
    fn save_all(&self, docs: &[T]) -> Result<(), StoreError>;
    fn delete_by_id(&self, key: &str) -> Result<(), StoreError>;
}
