//! Emote Remover Core Library
//!
//! This crate provides the chat filtering engine for the Emote Remover
//! extension. It hides chat entries holding given emotes in a live document
//! and puts them back, in place, when the emote is removed from the list.
//!
//! # Architecture
//!
//! The engine is host-agnostic. It drives a [`Document`] and registers for
//! change notifications through a [`MutationWatcher`]; the host calls
//! [`FilterEngine::notify`] whenever a registered watch fires. `er-wasm`
//! provides the browser implementation, [`memory`] an in-memory one.
//!
//! # Modules
//!
//! - `engine`: Filter engine (sweep, hide, restore, bulk mode)
//! - `document`: Host document and mutation watcher traits
//! - `memory`: Arena-backed document for tests and simulation
//! - `store`: Persisted key list and key store abstraction
//! - `config`: Engine configuration
//! - `types`: Shared type definitions

pub mod config;
pub mod document;
pub mod engine;
pub mod memory;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use document::{Document, DomError, MutationWatcher};
pub use engine::FilterEngine;
pub use store::{activation_keys, KeyList, KeyStore, ListChange, MemoryStore, StoreError};
pub use types::{FilterKey, FilterTarget, HiddenRecord, ObserveFlags};
