//! WebAssembly bindings for Emote Remover
//!
//! The content script calls `init` once per page, then drives the engine with
//! `activate` / `start` / `stop`. The popup only touches the stored list; when
//! it runs in the same context as an initialized engine, edits are applied to
//! the live page right away.

mod dom;
mod storage;

use std::cell::RefCell;

use er_core::{
    activation_keys, EngineConfig, FilterEngine, FilterTarget, KeyList, ListChange, StoreError,
};
use wasm_bindgen::prelude::*;

pub use dom::{WatchHandle, WebDocument, WebNode, WebWatcher};
pub use storage::LocalStore;

pub type WebEngine = FilterEngine<WebDocument, WebWatcher>;

thread_local! {
    static ENGINE: RefCell<Option<WebEngine>> = const { RefCell::new(None) };
}

/// Called by every `MutationObserver` the engine registers.
pub(crate) fn dispatch(target: &FilterTarget) {
    ENGINE.with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => {
            if let Some(engine) = slot.as_mut() {
                engine.notify(target);
            }
        }
        Err(_) => web_sys::console::warn_1(&"emote-remover: engine busy, notification skipped".into()),
    });
}

fn with_engine<T>(f: impl FnOnce(&mut WebEngine) -> T) -> Result<T, JsValue> {
    ENGINE.with(|cell| {
        let mut slot = cell
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Engine is busy"))?;
        let engine = slot
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Not initialized. Call init() first."))?;
        Ok(f(engine))
    })
}

fn store_error(e: StoreError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn current_config() -> EngineConfig {
    ENGINE.with(|cell| {
        cell.try_borrow()
            .ok()
            .and_then(|slot| slot.as_ref().map(|engine| engine.config().clone()))
            .unwrap_or_default()
    })
}

fn keys_to_js<'a>(keys: impl IntoIterator<Item = &'a er_core::FilterKey>) -> JsValue {
    let array = js_sys::Array::new();
    for key in keys {
        array.push(&JsValue::from_str(key.as_str()));
    }
    array.into()
}

#[wasm_bindgen]
pub fn init(config_json: Option<String>) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    if is_initialized() {
        return Err(JsValue::from_str("Already initialized. Reload the page to reinitialize."));
    }

    let config = match config_json.as_deref() {
        Some(text) => EngineConfig::from_json(text)
            .map_err(|e| JsValue::from_str(&format!("Failed to load config: {}", e)))?,
        None => EngineConfig::default(),
    };

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("No document available"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("Document has no body"))?;

    let engine = FilterEngine::new(
        WebDocument::new(document),
        WebWatcher::new(body.into()),
        config,
    );
    ENGINE.with(|cell| {
        let mut slot = cell
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Engine is busy"))?;
        *slot = Some(engine);
        Ok(())
    })
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    ENGINE.with(|cell| cell.try_borrow().map_or(true, |slot| slot.is_some()))
}

/// Toolbar action: start with the stored list, or the defaults if none.
#[wasm_bindgen]
pub fn activate() -> Result<u32, JsValue> {
    let store = LocalStore::open().map_err(store_error)?;
    let keys = activation_keys(&store, &current_config()).map_err(store_error)?;
    with_engine(|engine| engine.start(keys.keys().iter().cloned()) as u32)
}

#[wasm_bindgen]
pub fn start(keys: JsValue) -> Result<u32, JsValue> {
    if !js_sys::Array::is_array(&keys) {
        return Err(JsValue::from_str("Keys must be an array of strings"));
    }
    let keys: Vec<String> = js_sys::Array::from(&keys)
        .iter()
        .filter_map(|value| value.as_string())
        .collect();
    with_engine(|engine| engine.start(keys) as u32)
}

#[wasm_bindgen]
pub fn stop(key: &str) -> Result<u32, JsValue> {
    with_engine(|engine| engine.stop(key) as u32)
}

#[wasm_bindgen]
pub fn stop_all() -> Result<u32, JsValue> {
    with_engine(|engine| engine.stop_all() as u32)
}

#[wasm_bindgen]
pub fn start_bulk() -> Result<u32, JsValue> {
    with_engine(|engine| engine.start_bulk() as u32)
}

#[wasm_bindgen]
pub fn stop_bulk() -> Result<u32, JsValue> {
    with_engine(|engine| engine.stop_bulk() as u32)
}

#[wasm_bindgen]
pub fn active_keys() -> JsValue {
    with_engine(|engine| keys_to_js(engine.active_keys()))
        .unwrap_or_else(|_| js_sys::Array::new().into())
}

#[wasm_bindgen]
pub fn hidden_count() -> u32 {
    with_engine(|engine| engine.hidden_count() as u32).unwrap_or(0)
}

#[wasm_bindgen]
pub fn is_bulk_active() -> bool {
    with_engine(|engine| engine.is_bulk_active()).unwrap_or(false)
}

// =============================================================================
// Stored key list (popup)
// =============================================================================

#[wasm_bindgen]
pub fn stored_keys() -> Result<JsValue, JsValue> {
    let store = LocalStore::open().map_err(store_error)?;
    let list = KeyList::load(&store, &current_config().storage_key)
        .map_err(store_error)?
        .unwrap_or_default();
    Ok(keys_to_js(list.keys()))
}

#[wasm_bindgen]
pub fn add_stored_key(name: &str) -> Result<JsValue, JsValue> {
    edit_stored_list(|list| list.add(name))
}

#[wasm_bindgen]
pub fn remove_stored_key_at(index: u32) -> Result<JsValue, JsValue> {
    edit_stored_list(|list| list.remove_at(index as usize))
}

#[wasm_bindgen]
pub fn remove_stored_key(name: &str) -> Result<JsValue, JsValue> {
    edit_stored_list(|list| list.remove(name))
}

/// Apply `edit`, persist the result, sync a live engine, and return the
/// updated list.
fn edit_stored_list(edit: impl FnOnce(&mut KeyList) -> ListChange) -> Result<JsValue, JsValue> {
    let storage_key = current_config().storage_key;
    let mut store = LocalStore::open().map_err(store_error)?;
    let mut list = KeyList::load(&store, &storage_key)
        .map_err(store_error)?
        .unwrap_or_default();

    let change = edit(&mut list);
    if change.is_changed() {
        list.save(&mut store, &storage_key).map_err(store_error)?;
        if is_initialized() {
            with_engine(|engine| engine.apply_change(&change, &list))?;
        }
    }
    Ok(keys_to_js(list.keys()))
}
