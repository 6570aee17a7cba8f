//! JSON-file-backed store: one file per collection, committed atomically.

use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::repository::{Document, Repository, StoreError};

/// Durable document collection stored as `{base}/{collection}.json`,
/// a JSON object keyed by document key.
///
/// Writes go through a `.tmp` sibling and a rename, so a crashed run
/// leaves either the old file or the new one, never a torn mix.
pub struct JsonStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Document> JsonStore<T> {
    pub fn open(base: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(base)?;
        Ok(Self {
            path: base.join(format!("{}.json", T::COLLECTION)),
            _marker: PhantomData,
        })
    }

    fn load(&self) -> Result<BTreeMap<String, T>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn commit(&self, docs: &BTreeMap<String, T>) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(docs)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl<T: Document> Repository<T> for JsonStore<T> {
    fn find_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.load()?.into_values().collect())
    }

    fn find_by_id(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn save(&self, doc: &T) -> Result<(), StoreError> {
        let mut docs = self.load()?;
        docs.insert(doc.key(), doc.clone());
        self.commit(&docs)
    }

    fn save_all(&self, batch: &[T]) -> Result<(), StoreError> {
        let mut docs = self.load()?;
        for doc in batch {
            docs.insert(doc.key(), doc.clone());
        }
        self.commit(&docs)
    }

    fn delete_by_id(&self, key: &str) -> Result<(), StoreError> {
        let mut docs = self.load()?;
        if docs.remove(key).is_some() {
            self.commit(&docs)?;
        }
        Ok(())
    }
}
