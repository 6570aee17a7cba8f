//! gridline-store - Keyed document persistence for imported telemetry
//!
//! Every record type derives a deterministic string key from its identity
//! fields; saving with an existing key overwrites, never duplicates. The
//! pipeline only ever relies on this upsert primitive.

pub mod json;
pub mod memory;
pub mod repository;

pub use json::JsonStore;
pub use memory::MemoryStore;
pub use repository::{Document, Repository, StoreError};
