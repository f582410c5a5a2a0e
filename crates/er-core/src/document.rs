//! Host abstractions
//!
//! The engine never touches a browser directly. It works against a
//! [`Document`] (tree queries and the two mutations it needs) and a
//! [`MutationWatcher`] (subscribe / unsubscribe to change notifications).
//! `er-wasm` implements both on top of `web-sys`; [`crate::memory`] provides
//! an in-memory tree for tests and the CLI simulator.

use std::fmt::Debug;
use std::hash::Hash;

use crate::types::{FilterTarget, ObserveFlags};

/// Error type for host DOM operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node is not an element")]
    NotAnElement,
    #[error("Node has no parent")]
    NoParent,
    #[error("Document has no body")]
    NoBody,
    #[error("Reference node is not a child of the target parent")]
    NotAChild,
    #[error("Insertion would create a cycle")]
    Cycle,
    #[error("Host rejected operation: {0}")]
    Host(String),
}

/// A live, mutable document tree.
///
/// Node handles compare by identity: two handles are equal iff they refer to
/// the same node.
pub trait Document {
    type Node: Clone + Eq + Hash + Debug;

    /// Connected elements carrying attribute `name`, in document order.
    /// With `Some(value)` only exact matches are returned.
    fn elements_with_attribute(&self, name: &str, value: Option<&str>) -> Vec<Self::Node>;

    /// Whether `root` or any of its descendants carries the attribute.
    /// Works on detached subtrees too.
    fn subtree_has_attribute(&self, root: &Self::Node, name: &str, value: Option<&str>) -> bool;

    /// Nearest ancestor-or-self carrying `class`.
    fn closest_with_class(&self, node: &Self::Node, class: &str) -> Option<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Whether the node is reachable from the document root.
    fn is_connected(&self, node: &Self::Node) -> bool;

    fn body(&self) -> Option<Self::Node>;

    /// Remove `node` from its parent.
    fn detach(&mut self, node: &Self::Node) -> Result<(), DomError>;

    /// Insert `node` into `parent` before `reference`, or last when
    /// `reference` is `None`.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        node: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), DomError>;
}

/// Subscription to subtree mutations of the document.
///
/// A watch registered for a target makes the host call
/// [`crate::FilterEngine::notify`] with that target whenever the document
/// changes. Notifications may be batched or deferred; once `unwatch` returns,
/// the handle must never fire again.
pub trait MutationWatcher {
    type Handle: Debug;

    fn watch(&mut self, target: &FilterTarget, flags: ObserveFlags) -> Result<Self::Handle, DomError>;

    fn unwatch(&mut self, handle: Self::Handle);
}
