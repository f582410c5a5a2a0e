//! Browser implementations of the host traits

use std::cell::Cell;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use er_core::{Document, DomError, FilterTarget, MutationWatcher, ObserveFlags};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, MutationObserver, MutationObserverInit, Node, NodeList};

pub(crate) fn host_error(err: JsValue) -> DomError {
    DomError::Host(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

// =============================================================================
// WebNode
// =============================================================================

/// A DOM node with a stable identity.
///
/// JS objects cannot be hashed from Rust, so each node gets a numeric id kept
/// in a `WeakMap` owned by the document. Equality and hashing use that id.
#[derive(Debug, Clone)]
pub struct WebNode {
    id: u32,
    node: Node,
}

impl WebNode {
    pub fn node(&self) -> &Node {
        &self.node
    }

    fn element(&self) -> Option<&Element> {
        self.node.dyn_ref::<Element>()
    }
}

impl PartialEq for WebNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WebNode {}

impl Hash for WebNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// =============================================================================
// WebDocument
// =============================================================================

pub struct WebDocument {
    document: web_sys::Document,
    ids: js_sys::WeakMap,
    next_id: Cell<u32>,
}

impl WebDocument {
    pub fn new(document: web_sys::Document) -> Self {
        Self {
            document,
            ids: js_sys::WeakMap::new(),
            next_id: Cell::new(0),
        }
    }

    pub fn wrap(&self, node: Node) -> WebNode {
        let key: &js_sys::Object = node.as_ref();
        let id = match self.ids.get(key).as_f64() {
            Some(id) => id as u32,
            None => {
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                self.ids.set(key, &JsValue::from(id));
                id
            }
        };
        WebNode { id, node }
    }

    fn matching(&self, list: Result<NodeList, JsValue>, name: &str, value: Option<&str>) -> Vec<WebNode> {
        let list = match list {
            Ok(list) => list,
            Err(err) => {
                web_sys::console::warn_2(&"emote-remover: query failed".into(), &err);
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(list.length() as usize);
        for i in 0..list.length() {
            let Some(node) = list.item(i) else {
                continue;
            };
            if attribute_matches(node.dyn_ref::<Element>(), name, value) {
                out.push(self.wrap(node));
            }
        }
        out
    }
}

fn attribute_matches(element: Option<&Element>, name: &str, value: Option<&str>) -> bool {
    match (element.and_then(|e| e.get_attribute(name)), value) {
        (Some(actual), Some(expected)) => actual == expected,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

impl Document for WebDocument {
    type Node = WebNode;

    fn elements_with_attribute(&self, name: &str, value: Option<&str>) -> Vec<WebNode> {
        let selector = format!("[{}]", name);
        self.matching(self.document.query_selector_all(&selector), name, value)
    }

    fn subtree_has_attribute(&self, root: &WebNode, name: &str, value: Option<&str>) -> bool {
        let Some(element) = root.element() else {
            return false;
        };
        if attribute_matches(Some(element), name, value) {
            return true;
        }
        let selector = format!("[{}]", name);
        !self.matching(element.query_selector_all(&selector), name, value).is_empty()
    }

    fn closest_with_class(&self, node: &WebNode, class: &str) -> Option<WebNode> {
        let element = node.element()?;
        match element.closest(&format!(".{}", class)) {
            Ok(found) => found.map(|e| self.wrap(e.into())),
            Err(_) => None,
        }
    }

    fn parent(&self, node: &WebNode) -> Option<WebNode> {
        node.node.parent_node().map(|p| self.wrap(p))
    }

    fn next_sibling(&self, node: &WebNode) -> Option<WebNode> {
        node.node.next_sibling().map(|s| self.wrap(s))
    }

    fn is_connected(&self, node: &WebNode) -> bool {
        node.node.is_connected()
    }

    fn body(&self) -> Option<WebNode> {
        self.document.body().map(|b| self.wrap(b.into()))
    }

    fn detach(&mut self, node: &WebNode) -> Result<(), DomError> {
        let parent = node.node.parent_node().ok_or(DomError::NoParent)?;
        parent.remove_child(&node.node).map_err(host_error)?;
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &WebNode,
        node: &WebNode,
        reference: Option<&WebNode>,
    ) -> Result<(), DomError> {
        parent
            .node
            .insert_before(&node.node, reference.map(|r| &r.node))
            .map_err(host_error)?;
        Ok(())
    }
}

// =============================================================================
// WebWatcher
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(u32);

struct Watch {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

/// One `MutationObserver` per target, all observing the same root.
pub struct WebWatcher {
    root: Node,
    next_id: u32,
    watches: HashMap<WatchHandle, Watch>,
}

impl WebWatcher {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            next_id: 0,
            watches: HashMap::new(),
        }
    }
}

impl MutationWatcher for WebWatcher {
    type Handle = WatchHandle;

    fn watch(&mut self, target: &FilterTarget, flags: ObserveFlags) -> Result<WatchHandle, DomError> {
        let target = target.clone();
        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |_records: js_sys::Array, _observer: MutationObserver| {
                crate::dispatch(&target);
            },
        );

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(host_error)?;
        let options = MutationObserverInit::new();
        options.set_child_list(flags.contains(ObserveFlags::CHILD_LIST));
        options.set_subtree(flags.contains(ObserveFlags::SUBTREE));
        options.set_attributes(flags.contains(ObserveFlags::ATTRIBUTES));
        observer
            .observe_with_options(&self.root, &options)
            .map_err(host_error)?;

        let handle = WatchHandle(self.next_id);
        self.next_id += 1;
        self.watches.insert(
            handle,
            Watch {
                observer,
                _callback: callback,
            },
        );
        Ok(handle)
    }

    fn unwatch(&mut self, handle: WatchHandle) {
        if let Some(watch) = self.watches.remove(&handle) {
            watch.observer.disconnect();
        }
    }
}

impl Drop for WebWatcher {
    fn drop(&mut self) {
        for (_, watch) in self.watches.drain() {
            watch.observer.disconnect();
        }
    }
}
