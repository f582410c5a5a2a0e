//! Core type definitions for Emote Remover
//!
//! These types are shared by the engine, the key list and the host bindings.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Filter Keys
// =============================================================================

/// Name of one emote whose chat entries should be hidden.
///
/// Compared byte for byte against the identifying attribute. No trimming or
/// case folding is ever applied here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterKey(String);

impl FilterKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FilterKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FilterKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for FilterKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Filter Targets
// =============================================================================

/// Owner of a watch and of the elements it keeps hidden.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterTarget {
    /// Hides entries holding an emote with exactly this name
    Key(FilterKey),
    /// Hides entries holding any emote at all
    Bulk,
}

impl FilterTarget {
    pub fn key(&self) -> Option<&FilterKey> {
        match self {
            Self::Key(key) => Some(key),
            Self::Bulk => None,
        }
    }

    /// Attribute value this target matches, `None` meaning any value.
    pub fn attribute_value(&self) -> Option<&str> {
        self.key().map(FilterKey::as_str)
    }
}

impl fmt::Display for FilterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key `{key}`"),
            Self::Bulk => f.write_str("bulk"),
        }
    }
}

// =============================================================================
// Observe Flags
// =============================================================================

bitflags::bitflags! {
    /// Mutation kinds a watch subscribes to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObserveFlags: u8 {
        /// Children added to or removed from the watched node
        const CHILD_LIST = 1 << 0;
        /// Extend the watch to every descendant
        const SUBTREE = 1 << 1;
        /// Attribute changes
        const ATTRIBUTES = 1 << 2;

        /// What a chat page needs: new entries anywhere below the body
        const DEFAULT = Self::CHILD_LIST.bits() | Self::SUBTREE.bits();
    }
}

impl Default for ObserveFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// =============================================================================
// Hidden Records
// =============================================================================

/// Where a detached container used to live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenRecord<N> {
    /// The detached container
    pub element: N,
    /// Parent at the time of removal
    pub parent: N,
    /// Next sibling at the time of removal, `None` if it was the last child
    pub next_sibling: Option<N>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_key_is_exact() {
        assert_ne!(FilterKey::from("Kappa"), FilterKey::from("kappa"));
        assert_ne!(FilterKey::from("Kappa"), FilterKey::from(" Kappa"));
    }

    #[test]
    fn test_filter_key_serializes_as_string() {
        let json = serde_json::to_string(&vec![FilterKey::from("a"), FilterKey::from("b")]).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
    }

    #[test]
    fn test_target_attribute_value() {
        assert_eq!(FilterTarget::Key("X".into()).attribute_value(), Some("X"));
        assert_eq!(FilterTarget::Bulk.attribute_value(), None);
    }

    #[test]
    fn test_default_observe_flags() {
        let flags = ObserveFlags::default();
        assert!(flags.contains(ObserveFlags::CHILD_LIST | ObserveFlags::SUBTREE));
        assert!(!flags.contains(ObserveFlags::ATTRIBUTES));
    }
}
