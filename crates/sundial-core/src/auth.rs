use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const TOKENS_FILE: &str = "tokens.json";

/// Access/refresh token pair as held in durable client-local storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl TokenPair {
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// Durable token storage in the data directory. Reads are forgiving (a
/// missing or corrupt file yields an empty pair); writes are atomic.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        Ok(Self {
            path: data_dir.join(TOKENS_FILE),
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> TokenPair {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return TokenPair::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(pair) => pair,
            Err(err) => {
                warn!(file = %self.path.display(), error = %err, "corrupt token file, ignoring");
                TokenPair::default()
            }
        }
    }

    #[tracing::instrument(skip(self, pair))]
    pub fn save(&self, pair: &TokenPair) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string(pair)?;
        temp.write_all(serialized.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        debug!(file = %self.path.display(), "saved tokens");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
            debug!(file = %self.path.display(), "cleared tokens");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_save_and_load() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::open(dir.path()).expect("open");
        let pair = TokenPair {
            access: Some("acc".into()),
            refresh: Some("ref".into()),
        };
        store.save(&pair).expect("save");
        assert_eq!(store.load(), pair);
    }

    #[test]
    fn missing_file_loads_empty_pair() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::open(dir.path()).expect("open");
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty_pair() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::open(dir.path()).expect("open");
        fs::write(dir.path().join(TOKENS_FILE), "not json").expect("write");
        assert!(store.load().is_empty());
    }

    #[test]
    fn clear_removes_tokens() {
        let dir = tempdir().expect("tempdir");
        let store = TokenStore::open(dir.path()).expect("open");
        store
            .save(&TokenPair {
                access: Some("acc".into()),
                refresh: None,
            })
            .expect("save");
        store.clear().expect("clear");
        assert!(store.load().is_empty());
        // clearing twice is fine
        store.clear().expect("clear again");
    }
}
