//! In-memory store, used by tests and as the simplest backing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::repository::{Document, Repository, StoreError};

/// HashMap-backed document collection with upsert-by-key semantics.
pub struct MemoryStore<T> {
    docs: Mutex<HashMap<String, T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
        }
    }

    /// Every mutation under the lock is a single map insert or remove, so
    /// a poisoned lock still guards a consistent map.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, T>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Document> Repository<T> for MemoryStore<T> {
    fn find_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.lock().values().cloned().collect())
    }

    fn find_by_id(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn save(&self, doc: &T) -> Result<(), StoreError> {
        self.lock().insert(doc.key(), doc.clone());
        Ok(())
    }

    fn save_all(&self, batch: &[T]) -> Result<(), StoreError> {
        let mut docs = self.lock();
        for doc in batch {
            docs.insert(doc.key(), doc.clone());
        }
        Ok(())
    }

    fn delete_by_id(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Probe {
        id: i64,
        value: String,
    }

    impl Document for Probe {
        const COLLECTION: &'static str = "probes";

        fn key(&self) -> String {
            self.id.to_string()
        }
    }

    fn probe(id: i64, value: &str) -> Probe {
        Probe {
            id,
            value: value.to_string(),
        }
    }

    #[test]
    fn save_then_find() {
        let store = MemoryStore::new();
        store.save(&probe(7, "a")).unwrap();
        assert_eq!(store.find_by_id("7").unwrap(), Some(probe(7, "a")));
        assert_eq!(store.find_by_id("8").unwrap(), None);
    }

    #[test]
    fn save_overwrites_same_key() {
        let store = MemoryStore::new();
        store.save(&probe(7, "a")).unwrap();
        store.save(&probe(7, "b")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_id("7").unwrap().unwrap().value, "b");
    }

    #[test]
    fn save_all_is_idempotent() {
        let store = MemoryStore::new();
        let batch = vec![probe(1, "x"), probe(2, "y")];
        store.save_all(&batch).unwrap();
        store.save_all(&batch).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_removes() {
        let store = MemoryStore::new();
        store.save(&probe(1, "x")).unwrap();
        store.delete_by_id("1").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn poisoned_lock_still_serves() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.save(&probe(1, "x")).unwrap();

        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.docs.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(store.find_by_id("1").unwrap(), Some(probe(1, "x")));
        store.save(&probe(2, "y")).unwrap();
        assert_eq!(store.len(), 2);
    }
}
