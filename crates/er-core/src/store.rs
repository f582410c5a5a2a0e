//! Persisted key list
//!
//! The popup keeps an ordered list of emote names in a string key-value store
//! (`localStorage` in the extension). The list is stored as a JSON array of
//! strings under a single well-known name.

use std::collections::HashMap;

use log::debug;

use crate::config::EngineConfig;
use crate::types::FilterKey;

/// Error type for key store access.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Key store unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to read '{name}': {reason}")]
    Read { name: String, reason: String },
    #[error("Failed to write '{name}': {reason}")]
    Write { name: String, reason: String },
}

/// String key-value store holding the persisted list.
pub trait KeyStore {
    fn load(&self, name: &str) -> Result<Option<String>, StoreError>;

    fn save(&mut self, name: &str, value: &str) -> Result<(), StoreError>;
}

/// Volatile store for tests and the CLI simulator.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(name).cloned())
    }

    fn save(&mut self, name: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// KeyList
// =============================================================================

/// Outcome of editing a [`KeyList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    Added(FilterKey),
    Removed(FilterKey),
    Unchanged,
}

impl ListChange {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Ordered list of unique emote names.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyList {
    keys: Vec<FilterKey>,
}

impl KeyList {
    /// Parse a stored list.
    ///
    /// Anything that is not a JSON array yields an empty list. Non-string and
    /// empty items are skipped and duplicates keep their first position.
    pub fn parse(raw: &str) -> Self {
        let items: Vec<serde_json::Value> = match serde_json::from_str(raw) {
            Ok(serde_json::Value::Array(items)) => items,
            Ok(_) => {
                debug!("stored key list is not an array, starting empty");
                return Self::default();
            }
            Err(e) => {
                debug!("stored key list is malformed ({e}), starting empty");
                return Self::default();
            }
        };

        let mut list = Self::default();
        for item in items {
            if let serde_json::Value::String(name) = item {
                list.push_unique(FilterKey::from(name));
            }
        }
        list
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.keys).unwrap_or_else(|_| "[]".to_string())
    }

    /// Load the list stored under `name`; `None` if nothing was ever stored.
    pub fn load(store: &impl KeyStore, name: &str) -> Result<Option<Self>, StoreError> {
        Ok(store.load(name)?.map(|raw| Self::parse(&raw)))
    }

    pub fn save(&self, store: &mut impl KeyStore, name: &str) -> Result<(), StoreError> {
        store.save(name, &self.to_json())
    }

    /// Add a name typed by the user. Surrounding whitespace is trimmed;
    /// empty and already listed names are refused.
    pub fn add(&mut self, name: &str) -> ListChange {
        let key = FilterKey::from(name.trim());
        if self.push_unique(key.clone()) {
            ListChange::Added(key)
        } else {
            ListChange::Unchanged
        }
    }

    pub fn remove_at(&mut self, index: usize) -> ListChange {
        if index < self.keys.len() {
            ListChange::Removed(self.keys.remove(index))
        } else {
            ListChange::Unchanged
        }
    }

    pub fn remove(&mut self, name: &str) -> ListChange {
        match self.position(name) {
            Some(index) => self.remove_at(index),
            None => ListChange::Unchanged,
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.keys.iter().position(|key| key.as_str() == name)
    }

    pub fn keys(&self) -> &[FilterKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn push_unique(&mut self, key: FilterKey) -> bool {
        if key.is_empty() || self.contains(key.as_str()) {
            return false;
        }
        self.keys.push(key);
        true
    }
}

impl FromIterator<FilterKey> for KeyList {
    fn from_iter<T: IntoIterator<Item = FilterKey>>(iter: T) -> Self {
        let mut list = Self::default();
        for key in iter {
            list.push_unique(key);
        }
        list
    }
}

/// Keys the toolbar action starts with: the stored list, or the configured
/// defaults when nothing has been stored yet.
pub fn activation_keys(store: &impl KeyStore, config: &EngineConfig) -> Result<KeyList, StoreError> {
    Ok(KeyList::load(store, &config.storage_key)?
        .unwrap_or_else(|| config.default_keys.iter().cloned().collect()))
}
