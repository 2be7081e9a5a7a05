use std::collections::{BTreeMap, BTreeSet};

use crate::storage::error::StoreError;

/// Lowercases and trims a lookup key the way every operation expects it.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// In-memory word -> meanings map. Keys are normalized, meaning sets are
/// never empty. The separators `:` and `;` are reserved by the backing file
/// format, so entries containing them are rejected up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.entries.iter().map(|(word, meanings)| (word.as_str(), meanings))
    }

    pub fn lookup(&self, word: &str) -> Result<&BTreeSet<String>, StoreError> {
        self.entries
            .get(&normalize_word(word))
            .ok_or(StoreError::WordNotFound)
    }

    /// Adds a new word, seeding its meaning set by splitting `meaning` on `;`.
    pub fn insert(&mut self, word: &str, meaning: &str) -> Result<(), StoreError> {
        let word = valid_word(word)?;
        let meanings = split_meanings(meaning)?;
        if self.entries.contains_key(&word) {
            return Err(StoreError::WordExists);
        }
        self.entries.insert(word, meanings);
        Ok(())
    }

    pub fn remove(&mut self, word: &str) -> Result<(), StoreError> {
        self.entries
            .remove(&normalize_word(word))
            .map(|_| ())
            .ok_or(StoreError::WordNotFound)
    }

    /// Adds a single meaning to an existing word.
    pub fn add_meaning(&mut self, word: &str, meaning: &str) -> Result<(), StoreError> {
        let meaning = valid_meaning(meaning)?;
        let meanings = self
            .entries
            .get_mut(&normalize_word(word))
            .ok_or(StoreError::WordNotFound)?;
        if !meanings.insert(meaning) {
            return Err(StoreError::MeaningExists);
        }
        Ok(())
    }

    /// Replaces one meaning string in place. A resulting duplicate collapses
    /// under the set semantics.
    pub fn update_meaning(
        &mut self,
        word: &str,
        old_meaning: &str,
        new_meaning: &str,
    ) -> Result<(), StoreError> {
        let new_meaning = valid_meaning(new_meaning)?;
        let meanings = self
            .entries
            .get_mut(&normalize_word(word))
            .ok_or(StoreError::WordNotFound)?;
        if !meanings.remove(old_meaning.trim()) {
            return Err(StoreError::MeaningNotFound);
        }
        meanings.insert(new_meaning);
        Ok(())
    }

    /// Re-inserts an entry parsed from the backing file, replacing any
    /// earlier line for the same word.
    pub(crate) fn restore(&mut self, word: String, meanings: BTreeSet<String>) {
        self.entries.insert(word, meanings);
    }
}

fn valid_word(word: &str) -> Result<String, StoreError> {
    let word = normalize_word(word);
    if word.is_empty() || word.contains(':') || word.contains(';') {
        return Err(StoreError::InvalidInput);
    }
    Ok(word)
}

fn valid_meaning(meaning: &str) -> Result<String, StoreError> {
    let meaning = meaning.trim();
    if meaning.is_empty() || meaning.contains(':') || meaning.contains(';') {
        return Err(StoreError::InvalidInput);
    }
    Ok(meaning.to_string())
}

fn split_meanings(raw: &str) -> Result<BTreeSet<String>, StoreError> {
    let mut meanings = BTreeSet::new();
    for token in raw.split(';') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.contains(':') {
            return Err(StoreError::InvalidInput);
        }
        meanings.insert(token.to_string());
    }
    if meanings.is_empty() {
        return Err(StoreError::InvalidInput);
    }
    Ok(meanings)
}
