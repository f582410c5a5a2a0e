//! In-memory document tree
//!
//! A small arena-backed DOM used by the unit tests, the benchmark and the CLI
//! simulator. Mutations are recorded as pending [`ObserveFlags`] and delivered
//! to the engine by [`FilterEngine::settle`], which plays the role of the
//! browser's mutation observer tick.

use std::collections::BTreeMap;

use crate::document::{Document, DomError, MutationWatcher};
use crate::engine::FilterEngine;
use crate::types::{FilterTarget, ObserveFlags};

/// Upper bound on notification rounds in one `settle` call. A sweep is
/// idempotent, so a healthy engine quiesces after two rounds.
const MAX_SETTLE_ROUNDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

// =============================================================================
// MemoryDocument
// =============================================================================

#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    root: NodeId,
    body: Option<NodeId>,
    pending: ObserveFlags,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Create a document holding `<html><body></body></html>`.
    pub fn new() -> Self {
        let mut doc = Self::without_body();
        let body = doc.create_element("body", &[]);
        doc.link(doc.root, body, None);
        doc.body = Some(body);
        doc.pending = ObserveFlags::empty();
        doc
    }

    /// Create a document whose root has no body.
    pub fn without_body() -> Self {
        let root = NodeData {
            tag: "html".to_string(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            body: None,
            pending: ObserveFlags::empty(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: tag.to_string(),
            attributes: attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append `child` to `parent`, moving it if it is attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(&parent, &child, None)
    }

    /// Remove a node from its parent.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.detach(&node)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let data = &mut self.nodes[node.0];
        match data.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => data.attributes.push((name.to_string(), value.to_string())),
        }
        self.pending |= ObserveFlags::ATTRIBUTES;
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0]
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .map_or(false, |classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// First connected element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    /// Mutation kinds recorded since the last call.
    pub fn take_pending(&mut self) -> ObserveFlags {
        std::mem::replace(&mut self.pending, ObserveFlags::empty())
    }

    /// `root` and its descendants in document order.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    fn attribute_matches(&self, node: NodeId, name: &str, value: Option<&str>) -> bool {
        match (self.attribute(node, name), value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    fn unlink(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent.take()?;
        self.nodes[parent.0].children.retain(|c| *c != node);
        Some(parent)
    }

    fn link(&mut self, parent: NodeId, node: NodeId, index: Option<usize>) {
        let children = &mut self.nodes[parent.0].children;
        match index {
            Some(index) => children.insert(index, node),
            None => children.push(node),
        }
        self.nodes[node.0].parent = Some(parent);
        self.pending |= ObserveFlags::CHILD_LIST;
    }
}

impl Document for MemoryDocument {
    type Node = NodeId;

    fn elements_with_attribute(&self, name: &str, value: Option<&str>) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|node| self.attribute_matches(*node, name, value))
            .collect()
    }

    fn subtree_has_attribute(&self, root: &NodeId, name: &str, value: Option<&str>) -> bool {
        self.descendants(*root)
            .into_iter()
            .any(|node| self.attribute_matches(node, name, value))
    }

    fn closest_with_class(&self, node: &NodeId, class: &str) -> Option<NodeId> {
        let mut current = Some(*node);
        while let Some(id) = current {
            if self.has_class(id, class) {
                return Some(id);
            }
            current = self.nodes[id.0].parent;
        }
        None
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let siblings = &self.nodes[parent.0].children;
        let index = siblings.iter().position(|c| c == node)?;
        siblings.get(index + 1).copied()
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        self.is_ancestor_or_self(self.root, *node)
    }

    fn body(&self) -> Option<NodeId> {
        self.body
    }

    fn detach(&mut self, node: &NodeId) -> Result<(), DomError> {
        self.unlink(*node).ok_or(DomError::NoParent)?;
        self.pending |= ObserveFlags::CHILD_LIST;
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        node: &NodeId,
        reference: Option<&NodeId>,
    ) -> Result<(), DomError> {
        if self.is_ancestor_or_self(*node, *parent) {
            return Err(DomError::Cycle);
        }
        if let Some(reference) = reference {
            if self.nodes[reference.0].parent != Some(*parent) || reference == node {
                return Err(DomError::NotAChild);
            }
        }
        self.unlink(*node);
        let index = match reference {
            Some(reference) => self.nodes[parent.0].children.iter().position(|c| c == reference),
            None => None,
        };
        self.link(*parent, *node, index);
        Ok(())
    }
}

// =============================================================================
// MemoryWatcher
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(u32);

/// Records live watches; `settle` turns pending mutations into notifications.
#[derive(Debug, Default)]
pub struct MemoryWatcher {
    next_id: u32,
    watches: BTreeMap<WatchId, (FilterTarget, ObserveFlags)>,
}

impl MemoryWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live watches.
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    pub fn is_watching(&self, target: &FilterTarget) -> bool {
        self.watches.values().any(|(t, _)| t == target)
    }

    /// Targets whose watch covers at least one of the mutation kinds.
    pub fn targets_for(&self, kinds: ObserveFlags) -> Vec<FilterTarget> {
        let kinds = kinds - ObserveFlags::SUBTREE;
        self.watches
            .values()
            .filter(|(_, flags)| flags.intersects(kinds))
            .map(|(target, _)| target.clone())
            .collect()
    }
}

impl MutationWatcher for MemoryWatcher {
    type Handle = WatchId;

    fn watch(&mut self, target: &FilterTarget, flags: ObserveFlags) -> Result<WatchId, DomError> {
        let id = WatchId(self.next_id);
        self.next_id += 1;
        self.watches.insert(id, (target.clone(), flags));
        Ok(id)
    }

    fn unwatch(&mut self, handle: WatchId) {
        self.watches.remove(&handle);
    }
}

impl FilterEngine<MemoryDocument, MemoryWatcher> {
    /// Deliver pending mutations to the live watches until the document stops
    /// changing. Returns the number of containers detached along the way.
    pub fn settle(&mut self) -> usize {
        let mut detached = 0;
        for _ in 0..MAX_SETTLE_ROUNDS {
            let pending = self.document_mut().take_pending();
            if pending.is_empty() {
                break;
            }
            for target in self.watcher().targets_for(pending) {
                detached += self.notify(&target);
            }
        }
        detached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(doc: &mut MemoryDocument, id: &str) -> NodeId {
        doc.create_element("div", &[("id", id), ("class", "chat-entry highlighted")])
    }

    #[test]
    fn test_new_document_has_body() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        assert_eq!(doc.tag(body), "body");
        assert!(doc.is_connected(&body));
        assert_eq!(doc.children(doc.root()), &[body]);
    }

    #[test]
    fn test_queries_only_see_connected_nodes() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let a = doc.create_element("img", &[("data-emote-name", "X")]);
        let b = doc.create_element("img", &[("data-emote-name", "X")]);
        doc.append_child(body, a).unwrap();

        assert_eq!(doc.elements_with_attribute("data-emote-name", Some("X")), vec![a]);
        assert!(doc.subtree_has_attribute(&b, "data-emote-name", None));
        assert!(!doc.is_connected(&b));
    }

    #[test]
    fn test_closest_with_class_includes_self() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let container = entry(&mut doc, "a");
        let img = doc.create_element("img", &[]);
        doc.append_child(body, container).unwrap();
        doc.append_child(container, img).unwrap();

        assert_eq!(doc.closest_with_class(&img, "chat-entry"), Some(container));
        assert_eq!(doc.closest_with_class(&container, "chat-entry"), Some(container));
        assert_eq!(doc.closest_with_class(&img, "chat"), None);
    }

    #[test]
    fn test_insert_before_and_siblings() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let a = entry(&mut doc, "a");
        let b = entry(&mut doc, "b");
        let c = entry(&mut doc, "c");
        doc.append_child(body, a).unwrap();
        doc.append_child(body, c).unwrap();
        doc.insert_before(&body, &b, Some(&c)).unwrap();

        assert_eq!(doc.children(body), &[a, b, c]);
        assert_eq!(doc.next_sibling(&a), Some(b));
        assert_eq!(doc.next_sibling(&c), None);
    }

    #[test]
    fn test_insert_rejects_bad_reference_and_cycles() {
        let mut doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let a = entry(&mut doc, "a");
        let b = entry(&mut doc, "b");
        doc.append_child(body, a).unwrap();

        assert_eq!(doc.insert_before(&body, &b, Some(&b)), Err(DomError::NotAChild));
        assert_eq!(doc.insert_before(&a, &body, None), Err(DomError::Cycle));
        assert_eq!(doc.remove(b), Err(DomError::NoParent));
    }

    #[test]
    fn test_pending_mutations() {
        let mut doc = MemoryDocument::new();
        assert!(doc.take_pending().is_empty());

        let body = doc.body().unwrap();
        let a = entry(&mut doc, "a");
        doc.append_child(body, a).unwrap();
        doc.set_attribute(a, "title", "hi");

        let pending = doc.take_pending();
        assert!(pending.contains(ObserveFlags::CHILD_LIST | ObserveFlags::ATTRIBUTES));
        assert!(doc.take_pending().is_empty());
    }

    #[test]
    fn test_watcher_targets_follow_flags() {
        let mut watcher = MemoryWatcher::new();
        let key = FilterTarget::Key("X".into());
        let handle = watcher.watch(&key, ObserveFlags::DEFAULT).unwrap();
        watcher.watch(&FilterTarget::Bulk, ObserveFlags::DEFAULT | ObserveFlags::ATTRIBUTES).unwrap();

        assert_eq!(watcher.targets_for(ObserveFlags::CHILD_LIST).len(), 2);
        assert_eq!(watcher.targets_for(ObserveFlags::ATTRIBUTES), vec![FilterTarget::Bulk]);

        watcher.unwatch(handle);
        assert!(!watcher.is_watching(&key));
        assert_eq!(watcher.len(), 1);
    }
}
