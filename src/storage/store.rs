use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use tracing::warn;

use crate::storage::dictionary::Dictionary;
use crate::storage::error::StoreError;
use crate::storage::persistent::PersistentStore;

/// Shared dictionary handle. One coarse mutex guards every operation for its
/// full duration, so a compound check-then-mutate like `update_meaning`
/// cannot interleave with another caller, and the persistence write happens
/// inside the same critical section.
pub struct Store {
    dict: Mutex<Dictionary>,
    backing: PersistentStore,
}

impl Store {
    /// Loads the backing file (if any) and wraps the result in a live store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let backing = PersistentStore::new(path);
        let dict = backing.load()?;
        Ok(Self {
            dict: Mutex::new(dict),
            backing,
        })
    }

    pub fn len(&self) -> usize {
        self.dict.lock().unwrap().len()
    }

    pub fn lookup(&self, word: &str) -> Result<BTreeSet<String>, StoreError> {
        self.dict.lock().unwrap().lookup(word).cloned()
    }

    pub fn insert(&self, word: &str, meaning: &str) -> Result<(), StoreError> {
        let mut dict = self.dict.lock().unwrap();
        dict.insert(word, meaning)?;
        self.persist(&dict);
        Ok(())
    }

    pub fn remove(&self, word: &str) -> Result<(), StoreError> {
        let mut dict = self.dict.lock().unwrap();
        dict.remove(word)?;
        self.persist(&dict);
        Ok(())
    }

    pub fn add_meaning(&self, word: &str, meaning: &str) -> Result<(), StoreError> {
        let mut dict = self.dict.lock().unwrap();
        dict.add_meaning(word, meaning)?;
        self.persist(&dict);
        Ok(())
    }

    pub fn update_meaning(
        &self,
        word: &str,
        old_meaning: &str,
        new_meaning: &str,
    ) -> Result<(), StoreError> {
        let mut dict = self.dict.lock().unwrap();
        dict.update_meaning(word, old_meaning, new_meaning)?;
        self.persist(&dict);
        Ok(())
    }

    // The in-memory mutation has already been applied when a save fails, so
    // the store and the backing file can diverge until the next successful
    // write. The operator is warned rather than the client failed.
    fn persist(&self, dict: &Dictionary) {
        if let Err(e) = self.backing.save(dict) {
            warn!(
                "Failed to persist dictionary to {}: {}",
                self.backing.path().display(),
                e
            );
        }
    }
}
