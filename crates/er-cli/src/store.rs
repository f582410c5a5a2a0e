use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use er_core::{KeyStore, StoreError};

/// Key store persisted as a JSON object of string values, the same shape as
/// the extension's `localStorage`.
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let values = match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| StoreError::Read {
                name: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StoreError::Read {
                    name: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let write_error = |reason: String| StoreError::Write {
            name: self.path.display().to_string(),
            reason,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(&self.values).map_err(|e| write_error(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| write_error(e.to_string()))
    }
}

impl KeyStore for FileStore {
    fn load(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(name).cloned())
    }

    fn save(&mut self, name: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(name.to_string(), value.to_string());
        self.flush()
    }
}
