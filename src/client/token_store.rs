//! File-backed reconnection token store
//!
//! A flat TOML table of string keys, rewritten on every change.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::io_traits::{TokenStore, TokenStoreError};

pub struct FileTokenStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileTokenStore {
    /// Open the store, starting empty when the file is missing or unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(values) => values,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "[TOKENS] Ignoring corrupt token file"
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "[TOKENS] No token file yet");
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), TokenStoreError> {
        let contents =
            toml::to_string(&self.values).map_err(|e| TokenStoreError::Encode(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), TokenStoreError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
