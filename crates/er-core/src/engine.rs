//! Filter Engine
//!
//! Hides chat entries holding given emotes and restores them on request.
//!
//! Every detached container has one entry in the hidden registry: where it
//! came from, and the set of targets currently holding it. A container stays
//! detached while at least one holder remains, so an entry matching two keys
//! comes back only after both keys are stopped.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::document::{Document, MutationWatcher};
use crate::store::{KeyList, ListChange};
use crate::types::{FilterKey, FilterTarget, HiddenRecord};

struct HiddenEntry<N> {
    record: HiddenRecord<N>,
    holders: HashSet<FilterTarget>,
    /// Registration order, used to visit the registry deterministically
    seq: u64,
}

struct ActiveFilter<H, N> {
    /// `None` while the initial sweep runs, or if the host refused the watch
    handle: Option<H>,
    /// Containers held by this target, in the order they were hidden
    hidden: Vec<N>,
}

impl<H, N> ActiveFilter<H, N> {
    fn new(hidden: Vec<N>) -> Self {
        Self { handle: None, hidden }
    }
}

enum Hide {
    /// Target already held the container
    AlreadyHeld,
    /// Container was already detached; target added as a holder
    Joined,
    /// Container was taken out of the document
    Detached { newly_held: bool },
    /// Host refused the removal
    Failed,
}

/// Hides and restores chat entries in a live document.
pub struct FilterEngine<D: Document, W: MutationWatcher> {
    config: EngineConfig,
    document: D,
    watcher: W,
    hidden: HashMap<D::Node, HiddenEntry<D::Node>>,
    filters: BTreeMap<FilterKey, ActiveFilter<W::Handle, D::Node>>,
    bulk: Option<ActiveFilter<W::Handle, D::Node>>,
    next_seq: u64,
}

impl<D: Document, W: MutationWatcher> FilterEngine<D, W> {
    pub fn new(document: D, watcher: W, config: EngineConfig) -> Self {
        Self {
            config,
            document,
            watcher,
            hidden: HashMap::new(),
            filters: BTreeMap::new(),
            bulk: None,
            next_seq: 0,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start filtering every key not already active.
    ///
    /// Each new key is swept immediately, then watched so entries added later
    /// are hidden on the next notification. Empty keys are ignored. Returns
    /// the number of containers detached by the initial sweeps.
    pub fn start<I, K>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: Into<FilterKey>,
    {
        let mut detached = 0;
        for key in keys {
            let key = key.into();
            if key.is_empty() {
                continue;
            }
            if self.filters.contains_key(&key) {
                trace!("filter {key} already active");
                continue;
            }
            self.filters.insert(key.clone(), ActiveFilter::new(Vec::new()));
            detached += self.activate(FilterTarget::Key(key));
        }
        detached
    }

    /// Stop filtering `key` and restore what only it was hiding.
    ///
    /// Returns the number of containers put back into the document.
    pub fn stop(&mut self, key: &str) -> usize {
        let Some(filter) = self.filters.remove(key) else {
            return 0;
        };
        let target = FilterTarget::Key(FilterKey::from(key));
        self.deactivate(&target, filter)
    }

    /// Hide every entry holding any emote.
    ///
    /// A previous bulk watch is disconnected and replaced. Entries it was
    /// already hiding stay hidden under the new instance.
    pub fn start_bulk(&mut self) -> usize {
        let held = match self.bulk.take() {
            Some(previous) => {
                if let Some(handle) = previous.handle {
                    self.watcher.unwatch(handle);
                }
                debug!("replacing bulk filter holding {} entries", previous.hidden.len());
                previous.hidden
            }
            None => Vec::new(),
        };
        self.bulk = Some(ActiveFilter::new(held));
        self.activate(FilterTarget::Bulk)
    }

    /// Stop bulk mode only.
    pub fn stop_bulk(&mut self) -> usize {
        match self.bulk.take() {
            Some(filter) => self.deactivate(&FilterTarget::Bulk, filter),
            None => 0,
        }
    }

    /// Stop every key and bulk mode, restoring everything.
    ///
    /// Every watch is disconnected first, then the whole registry is put back
    /// newest first, so adjacent entries held by different targets regain
    /// their order.
    pub fn stop_all(&mut self) -> usize {
        let filters = std::mem::take(&mut self.filters);
        let handles = filters
            .into_values()
            .chain(self.bulk.take())
            .filter_map(|filter| filter.handle);
        for handle in handles {
            self.watcher.unwatch(handle);
        }

        let mut order: Vec<(u64, D::Node)> = self
            .hidden
            .iter()
            .map(|(node, entry)| (entry.seq, node.clone()))
            .collect();
        order.sort_by_key(|(seq, _)| std::cmp::Reverse(*seq));

        let mut restored = 0;
        for (_, node) in order {
            let Some(entry) = self.hidden.remove(&node) else {
                continue;
            };
            if self.restore(&entry.record) {
                restored += 1;
            }
        }
        debug!("stopped all filters, restored {restored} entries");
        restored
    }

    /// Dispatch entry point for the host's mutation callback.
    ///
    /// Re-sweeps `target` if it is still active; notifications for stopped
    /// targets are dropped.
    pub fn notify(&mut self, target: &FilterTarget) -> usize {
        if !self.is_target_active(target) {
            trace!("dropping notification for inactive {target}");
            return 0;
        }
        self.sweep(target)
    }

    /// Bring the live page in line with an edit of the stored key list.
    pub fn apply_change(&mut self, change: &ListChange, list: &KeyList) -> usize {
        match change {
            ListChange::Added(_) => self.start(list.keys().iter().cloned()),
            ListChange::Removed(key) => self.stop(key.as_str()),
            ListChange::Unchanged => 0,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_active(&self, key: &str) -> bool {
        self.filters.contains_key(key)
    }

    pub fn active_keys(&self) -> Vec<&FilterKey> {
        self.filters.keys().collect()
    }

    pub fn is_bulk_active(&self) -> bool {
        self.bulk.is_some()
    }

    pub fn is_hidden(&self, node: &D::Node) -> bool {
        self.hidden.contains_key(node)
    }

    /// Number of containers currently detached.
    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }

    /// Containers held by `target`, in the order they were hidden.
    pub fn hidden_for(&self, target: &FilterTarget) -> &[D::Node] {
        self.filter(target)
            .map(|filter| filter.hidden.as_slice())
            .unwrap_or(&[])
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn filter(&self, target: &FilterTarget) -> Option<&ActiveFilter<W::Handle, D::Node>> {
        match target {
            FilterTarget::Key(key) => self.filters.get(key),
            FilterTarget::Bulk => self.bulk.as_ref(),
        }
    }

    fn filter_mut(&mut self, target: &FilterTarget) -> Option<&mut ActiveFilter<W::Handle, D::Node>> {
        match target {
            FilterTarget::Key(key) => self.filters.get_mut(key),
            FilterTarget::Bulk => self.bulk.as_mut(),
        }
    }

    fn is_target_active(&self, target: &FilterTarget) -> bool {
        self.filter(target).is_some()
    }

    /// Initial sweep and watch registration for a freshly inserted filter.
    fn activate(&mut self, target: FilterTarget) -> usize {
        let joined = self.join_hidden(&target);
        let detached = self.sweep(&target);

        match self.watcher.watch(&target, self.config.observe_flags()) {
            Ok(handle) => {
                if let Some(filter) = self.filter_mut(&target) {
                    filter.handle = Some(handle);
                }
            }
            Err(e) => warn!("failed to watch document for {target}: {e}"),
        }

        debug!("started {target}: {detached} detached, {joined} already hidden");
        detached
    }

    fn deactivate(&mut self, target: &FilterTarget, filter: ActiveFilter<W::Handle, D::Node>) -> usize {
        if let Some(handle) = filter.handle {
            self.watcher.unwatch(handle);
        }
        let held = filter.hidden.len();
        let restored = self.release(target, filter.hidden);
        debug!("stopped {target}: released {held}, restored {restored}");
        restored
    }

    /// Hide every connected container matching `target`.
    fn sweep(&mut self, target: &FilterTarget) -> usize {
        let attribute = self.config.attribute.clone();
        let class = self.config.container_class.clone();

        let mut detached = 0;
        for element in self.document.elements_with_attribute(&attribute, target.attribute_value()) {
            let Some(container) = self.document.closest_with_class(&element, &class) else {
                continue;
            };
            match self.hide(container.clone(), target) {
                Hide::Detached { newly_held } => {
                    detached += 1;
                    if newly_held {
                        self.hold(target, container);
                    }
                }
                Hide::Joined => self.hold(target, container),
                Hide::AlreadyHeld | Hide::Failed => {}
            }
        }
        detached
    }

    /// Add `target` as a holder of already detached containers it matches.
    fn join_hidden(&mut self, target: &FilterTarget) -> usize {
        let mut candidates: Vec<(u64, D::Node)> = self
            .hidden
            .iter()
            .filter(|(_, entry)| !entry.holders.contains(target))
            .map(|(node, entry)| (entry.seq, node.clone()))
            .collect();
        candidates.sort_by_key(|(seq, _)| *seq);

        let mut joined = 0;
        for (_, node) in candidates {
            if self.document.is_connected(&node) || !self.matches(&node, target) {
                continue;
            }
            if let Some(entry) = self.hidden.get_mut(&node) {
                entry.holders.insert(target.clone());
            }
            self.hold(target, node);
            joined += 1;
        }
        joined
    }

    fn hide(&mut self, container: D::Node, target: &FilterTarget) -> Hide {
        let mut newly_held = true;
        if let Some(entry) = self.hidden.get_mut(&container) {
            if !self.document.is_connected(&container) {
                return if entry.holders.insert(target.clone()) {
                    Hide::Joined
                } else {
                    Hide::AlreadyHeld
                };
            }
            // Put back by the page itself; detach again from its new position.
            newly_held = !entry.holders.contains(target);
        }

        let Some(parent) = self.document.parent(&container) else {
            return Hide::Failed;
        };
        let next_sibling = self.document.next_sibling(&container);
        if let Err(e) = self.document.detach(&container) {
            warn!("failed to detach chat entry for {target}: {e}");
            return Hide::Failed;
        }
        trace!("detached {container:?} for {target}");

        let record = HiddenRecord {
            element: container.clone(),
            parent,
            next_sibling,
        };
        match self.hidden.get_mut(&container) {
            Some(entry) => {
                entry.record = record;
                entry.holders.insert(target.clone());
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                let mut holders = HashSet::new();
                holders.insert(target.clone());
                self.hidden.insert(container.clone(), HiddenEntry { record, holders, seq });
            }
        }
        self.adopt_by_others(&container, target);

        Hide::Detached { newly_held }
    }

    /// Register every other active target the detached container matches, so
    /// stopping `target` alone does not bring it back.
    fn adopt_by_others(&mut self, container: &D::Node, target: &FilterTarget) {
        let mut others: Vec<FilterTarget> = self
            .filters
            .keys()
            .map(|key| FilterTarget::Key(key.clone()))
            .collect();
        if self.bulk.is_some() {
            others.push(FilterTarget::Bulk);
        }

        for other in others {
            if &other == target || !self.matches(container, &other) {
                continue;
            }
            let added = self
                .hidden
                .get_mut(container)
                .map_or(false, |entry| entry.holders.insert(other.clone()));
            if added {
                self.hold(&other, container.clone());
            }
        }
    }

    fn matches(&self, container: &D::Node, target: &FilterTarget) -> bool {
        self.document
            .subtree_has_attribute(container, &self.config.attribute, target.attribute_value())
    }

    fn hold(&mut self, target: &FilterTarget, node: D::Node) {
        if let Some(filter) = self.filter_mut(target) {
            filter.hidden.push(node);
        }
    }

    /// Drop `target` from every container it holds, restoring those left with
    /// no holder. Walks newest first so adjacent entries regain their order.
    fn release(&mut self, target: &FilterTarget, held: Vec<D::Node>) -> usize {
        let mut restored = 0;
        for node in held.into_iter().rev() {
            let Some(entry) = self.hidden.get_mut(&node) else {
                continue;
            };
            entry.holders.remove(target);
            if !entry.holders.is_empty() {
                continue;
            }
            let Some(entry) = self.hidden.remove(&node) else {
                continue;
            };
            if self.restore(&entry.record) {
                restored += 1;
            }
        }
        restored
    }

    fn restore(&mut self, record: &HiddenRecord<D::Node>) -> bool {
        let element = &record.element;
        if self.document.is_connected(element) {
            return false;
        }

        if self.document.is_connected(&record.parent) {
            let reference = self.anchor(&record.parent, record.next_sibling.clone());
            match self.document.insert_before(&record.parent, element, reference.as_ref()) {
                Ok(()) => return true,
                Err(e) => warn!("failed to restore {element:?} in place: {e}"),
            }
        }

        let Some(body) = self.document.body() else {
            warn!("dropping {element:?}: no body to restore into");
            return false;
        };
        match self.document.insert_before(&body, element, None) {
            Ok(()) => true,
            Err(e) => {
                warn!("dropping {element:?}: {e}");
                false
            }
        }
    }

    /// Node to insert before when restoring under `parent`.
    ///
    /// A recorded sibling that is itself still hidden under the same parent is
    /// skipped by following its own recorded sibling.
    fn anchor(&self, parent: &D::Node, mut candidate: Option<D::Node>) -> Option<D::Node> {
        let mut steps = 0;
        while let Some(sibling) = candidate {
            if self.document.parent(&sibling).as_ref() == Some(parent) {
                return Some(sibling);
            }
            steps += 1;
            if steps > self.hidden.len() {
                return None;
            }
            candidate = match self.hidden.get(&sibling) {
                Some(entry) if &entry.record.parent == parent => entry.record.next_sibling.clone(),
                _ => None,
            };
        }
        None
    }
}
