use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::storage::dictionary::Dictionary;

/// Flat-file gateway for the dictionary. One line per word,
/// `word:meaning1;meaning2;...`, rewritten wholesale on every save.
pub struct PersistentStore {
    path: PathBuf,
}

impl PersistentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebuilds the dictionary from the backing file. A missing file yields
    /// an empty dictionary; lines without exactly one `:` are skipped.
    pub fn load(&self) -> Result<Dictionary> {
        let mut dict = Dictionary::new();

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No backing file at {}, starting empty", self.path.display());
                return Ok(dict);
            }
            Err(e) => return Err(e.into()),
        };

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.split(':');
            let (Some(word), Some(meanings), None) = (parts.next(), parts.next(), parts.next())
            else {
                debug!("Skipping malformed line in {}: {}", self.path.display(), line);
                continue;
            };

            let word = word.trim().to_lowercase();
            let meanings = meanings
                .split(';')
                .map(str::trim)
                .filter(|meaning| !meaning.is_empty())
                .map(str::to_string)
                .collect::<std::collections::BTreeSet<_>>();

            if word.is_empty() || meanings.is_empty() {
                debug!("Skipping malformed line in {}: {}", self.path.display(), line);
                continue;
            }

            dict.restore(word, meanings);
        }

        Ok(dict)
    }

    /// Rewrites the backing file from scratch. The new content goes to a
    /// temporary file first and is renamed over the target, so a crash
    /// mid-write never leaves a partial file behind.
    pub fn save(&self, dict: &Dictionary) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut content = String::new();
        for (word, meanings) in dict.iter() {
            let joined = meanings
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(";");
            content.push_str(word);
            content.push(':');
            content.push_str(&joined);
            content.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> PersistentStore {
        PersistentStore::new(dir.path().join("dictionary.txt"))
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let dir = TempDir::new().unwrap();
        let dict = store_in(&dir).load().unwrap();
        assert_eq!(dict.len(), 0);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut dict = Dictionary::new();
        dict.insert("cat", "feline;small carnivore").unwrap();
        dict.insert("dog", "canine").unwrap();

        store.save(&dict).unwrap();
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, dict);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.txt");
        std::fs::write(
            &path,
            "cat:feline;small carnivore\n\
             no-separator\n\
             too:many:colons\n\
             :missing-word\n\
             empty-meanings: ; ; \n",
        )
        .unwrap();

        let dict = PersistentStore::new(path).load().unwrap();
        assert_eq!(dict.len(), 1);
        assert!(dict.lookup("cat").is_ok());
    }

    #[test]
    fn load_normalizes_words() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.txt");
        std::fs::write(&path, "  CaT :feline\n").unwrap();

        let dict = PersistentStore::new(path).load().unwrap();
        let meanings = dict.lookup("cat").unwrap();
        assert!(meanings.contains("feline"));
    }

    #[test]
    fn duplicate_lines_keep_the_last_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.txt");
        std::fs::write(&path, "cat:feline\ncat:tabby\n").unwrap();

        let dict = PersistentStore::new(path).load().unwrap();
        assert_eq!(dict.len(), 1);
        assert!(dict.lookup("cat").unwrap().contains("tabby"));
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut dict = Dictionary::new();
        dict.insert("cat", "feline").unwrap();
        store.save(&dict).unwrap();

        assert!(store.path().exists());
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = PersistentStore::new(dir.path().join("nested/data/dictionary.txt"));

        let mut dict = Dictionary::new();
        dict.insert("cat", "feline").unwrap();
        store.save(&dict).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, dict);
    }
}
