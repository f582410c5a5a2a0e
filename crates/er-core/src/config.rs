//! Engine configuration
//!
//! Every field has a default matching the chat page the extension targets, so
//! an empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::types::{FilterKey, ObserveFlags};

/// Attribute carried by every emote image in the chat.
pub const DEFAULT_ATTRIBUTE: &str = "data-emote-name";
/// Class marking one chat message.
pub const DEFAULT_CONTAINER_CLASS: &str = "chat-entry";
/// Storage name of the persisted key list.
pub const DEFAULT_STORAGE_KEY: &str = "emoteList";
/// Keys used by the toolbar action when nothing has been stored yet.
pub const DEFAULT_KEYS: &[&str] = &["PatrickBoo", "RishiBypass"];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Configuration field `{0}` must not be empty")]
    EmptyField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Attribute whose value is compared against filter keys
    pub attribute: String,
    /// Class of the container that gets hidden
    pub container_class: String,
    /// Also re-sweep when attributes change, not only when nodes are added
    pub observe_attributes: bool,
    /// Name the key list is stored under
    pub storage_key: String,
    /// Keys started by `activate` when no list is stored
    pub default_keys: Vec<FilterKey>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attribute: DEFAULT_ATTRIBUTE.to_string(),
            container_class: DEFAULT_CONTAINER_CLASS.to_string(),
            observe_attributes: false,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_keys: DEFAULT_KEYS.iter().map(|k| FilterKey::from(*k)).collect(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attribute.trim().is_empty() {
            return Err(ConfigError::EmptyField("attribute"));
        }
        if self.container_class.trim().is_empty() {
            return Err(ConfigError::EmptyField("containerClass"));
        }
        if self.storage_key.is_empty() {
            return Err(ConfigError::EmptyField("storageKey"));
        }
        Ok(())
    }

    pub fn observe_flags(&self) -> ObserveFlags {
        if self.observe_attributes {
            ObserveFlags::DEFAULT | ObserveFlags::ATTRIBUTES
        } else {
            ObserveFlags::DEFAULT
        }
    }
}
