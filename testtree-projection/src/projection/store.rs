// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::events::ItemResult;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};
use testtree_metadata::{ExpandState, TestId, TestItemPatch, TestItemSummary, TestResultState};
use tracing::trace;

/// One test or test group owned by the [`NodeStore`].
#[derive(Clone, Debug)]
pub struct TestNode {
    id: TestId,
    summary: TestItemSummary,
    children: Vec<TestId>,
    expand: ExpandState,
    own_state: TestResultState,
    computed_state: TestResultState,
    insertion: u64,
}

impl TestNode {
    fn new(
        id: TestId,
        summary: TestItemSummary,
        expand: ExpandState,
        initial: ItemResult,
        insertion: u64,
    ) -> Self {
        Self {
            id,
            summary,
            children: Vec::new(),
            expand,
            own_state: initial.own_state,
            computed_state: initial.computed_state,
            insertion,
        }
    }

    /// The node's identity.
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// Display attributes.
    pub fn summary(&self) -> &TestItemSummary {
        &self.summary
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        &self.summary.label
    }

    /// Error text surfaced as a synthetic child, if any.
    pub fn error(&self) -> Option<&str> {
        self.summary.error.as_deref()
    }

    /// Child ids in sibling sort order.
    pub fn children(&self) -> &[TestId] {
        &self.children
    }

    /// Current expand tri-state.
    pub fn expand(&self) -> ExpandState {
        self.expand
    }

    /// The state observed directly on this item.
    pub fn own_state(&self) -> TestResultState {
        self.own_state
    }

    /// The displayed rollup over this item and its subtree.
    pub fn computed_state(&self) -> TestResultState {
        self.computed_state
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Sibling comparator: `sort_text` if both sides define it, else `label`;
/// ties fall back to insertion order, which keeps re-insertions stable.
fn sibling_order(a: &TestNode, b: &TestNode) -> Ordering {
    let key = match (&a.summary.sort_text, &b.summary.sort_text) {
        (Some(a_key), Some(b_key)) => a_key.cmp(b_key),
        _ => a.summary.label.cmp(&b.summary.label),
    };
    key.then(a.insertion.cmp(&b.insertion))
}

/// Affected-node markers accumulated by store mutations and drained by the
/// projection bridge in the same synchronous flush.
#[derive(Debug, Default)]
pub(crate) struct ChangeLog {
    /// Parents whose child list (membership, order, or synthetic error
    /// child) changed. `None` is the root list.
    pub(crate) children_changed: BTreeSet<Option<TestId>>,

    /// Nodes whose display attributes changed.
    pub(crate) attrs_changed: BTreeSet<TestId>,

    /// Nodes whose result state changed.
    pub(crate) state_changed: BTreeSet<TestId>,

    /// Ids removed from the store, descendants before ancestors.
    pub(crate) removed: Vec<TestId>,
}

impl ChangeLog {
    pub(crate) fn is_empty(&self) -> bool {
        self.children_changed.is_empty()
            && self.attrs_changed.is_empty()
            && self.state_changed.is_empty()
            && self.removed.is_empty()
    }
}

/// In-memory ownership of the projected tree: a map from id to node plus the
/// ordered root list.
///
/// The store is the single owner of node lifetime. Children are non-owning
/// id references back into the same store, kept in sibling sort order at all
/// times.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: BTreeMap<TestId, TestNode>,
    roots: Vec<TestId>,
    insertion_counter: u64,
    changes: ChangeLog,
}

impl NodeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a node by id.
    pub fn get(&self, id: &TestId) -> Option<&TestNode> {
        self.nodes.get(id)
    }

    /// Returns true if the id is present.
    pub fn contains(&self, id: &TestId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Child ids of a node in sibling sort order; empty for unknown ids.
    pub fn children(&self, id: &TestId) -> &[TestId] {
        self.nodes.get(id).map_or(&[], |node| node.children())
    }

    /// Root (controller) ids in sibling sort order.
    pub fn roots(&self) -> &[TestId] {
        &self.roots
    }

    /// Returns true if the id is present and is a controller root.
    pub fn is_root(&self, id: &TestId) -> bool {
        id.is_root() && self.contains(id)
    }

    /// Number of nodes in the store.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the store has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TestNode> {
        self.nodes.values()
    }

    /// Creates a node, or re-applies attributes if the id already exists.
    /// Returns false (leaving the store untouched) if the node is not a root
    /// and its parent is absent.
    pub(crate) fn upsert(
        &mut self,
        id: TestId,
        summary: TestItemSummary,
        expand: ExpandState,
        initial: ItemResult,
    ) -> bool {
        if self.nodes.contains_key(&id) {
            // Re-announcement of a known id: a full attribute update.
            let patch = TestItemPatch {
                label: Some(summary.label),
                sort_text: Some(summary.sort_text),
                error: Some(summary.error),
                uri: Some(summary.uri),
                range: Some(summary.range),
            };
            self.update(&id, &patch);
            let node = self
                .nodes
                .get_mut(&id)
                .expect("presence checked above");
            node.summary.tags = summary.tags;
            // The provider's flag never demotes a node that still has
            // children or an error leaf to reveal.
            let demotes = expand == ExpandState::NotExpandable
                && !(node.children.is_empty() && node.summary.error.is_none());
            if node.expand != expand && !demotes {
                node.expand = expand;
                self.changes.children_changed.insert(Some(id));
            }
            return true;
        }

        let insertion = self.next_insertion();
        match id.parent() {
            None => {
                let node = TestNode::new(id.clone(), summary, expand, initial, insertion);
                let pos = self.sorted_position(&self.roots, &node);
                self.roots.insert(pos, id.clone());
                self.nodes.insert(id, node);
                self.changes.children_changed.insert(None);
            }
            Some(parent_id) => {
                if !self.nodes.contains_key(&parent_id) {
                    return false;
                }
                let node = TestNode::new(id.clone(), summary, expand, initial, insertion);
                let pos = self.sorted_position(&self.nodes[&parent_id].children, &node);
                let parent = self
                    .nodes
                    .get_mut(&parent_id)
                    .expect("presence checked above");
                parent.children.insert(pos, id.clone());
                if parent.expand == ExpandState::NotExpandable {
                    parent.expand = ExpandState::Expandable;
                }
                self.nodes.insert(id, node);
                self.changes.children_changed.insert(Some(parent_id));
            }
        }
        true
    }

    /// Applies a partial attribute update. Returns false for unknown ids.
    pub(crate) fn update(&mut self, id: &TestId, patch: &TestItemPatch) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let label_before = node.summary.label.clone();
        let sort_text_before = node.summary.sort_text.clone();
        let error_before = node.summary.error.clone();
        patch.apply_to(&mut node.summary);
        let sort_key_changed =
            node.summary.label != label_before || node.summary.sort_text != sort_text_before;
        let error_changed = node.summary.error != error_before;

        if error_changed {
            // The synthetic error child lives in the node's rendered child
            // list, so the node must be expandable while the error is set.
            if node.summary.error.is_some() {
                if node.expand == ExpandState::NotExpandable {
                    node.expand = ExpandState::Expandable;
                }
            } else if node.children.is_empty() {
                node.expand = ExpandState::NotExpandable;
            }
        }

        if sort_key_changed {
            self.reposition(id);
        }
        self.changes.attrs_changed.insert(id.clone());
        if error_changed {
            self.changes.children_changed.insert(Some(id.clone()));
        }
        true
    }

    /// Removes a node and all descendants, descendants first. Returns the
    /// removed ids in that order; empty for unknown ids.
    pub(crate) fn remove(&mut self, id: &TestId) -> Vec<TestId> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }
        let mut removed = Vec::new();
        self.collect_postorder(id, &mut removed);
        for removed_id in &removed {
            self.nodes.remove(removed_id);
            trace!(id = %removed_id, "removed node");
        }

        match id.parent() {
            None => {
                self.roots.retain(|root| root != id);
                self.changes.children_changed.insert(None);
            }
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    parent.children.retain(|child| child != id);
                    if parent.children.is_empty() {
                        parent.expand = ExpandState::NotExpandable;
                    }
                    self.changes.children_changed.insert(Some(parent_id));
                }
            }
        }
        self.changes.removed.extend(removed.iter().cloned());
        removed
    }

    /// Sets the expand tri-state without recording a change marker; callers
    /// drive the control directly.
    pub(crate) fn set_expand(&mut self, id: &TestId, expand: ExpandState) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.expand = expand;
        }
    }

    /// Sets both result states, recording a marker if either changed.
    /// Returns whether the computed state changed.
    pub(crate) fn set_states(
        &mut self,
        id: &TestId,
        own_state: TestResultState,
        computed_state: TestResultState,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let computed_changed = node.computed_state != computed_state;
        if node.own_state != own_state || computed_changed {
            node.own_state = own_state;
            node.computed_state = computed_state;
            self.changes.state_changed.insert(id.clone());
        }
        computed_changed
    }

    /// Sets only the computed state. Returns whether it changed.
    pub(crate) fn set_computed_state(
        &mut self,
        id: &TestId,
        computed_state: TestResultState,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.computed_state == computed_state {
            return false;
        }
        node.computed_state = computed_state;
        self.changes.state_changed.insert(id.clone());
        true
    }

    /// Drains the accumulated change markers for one bridge flush.
    pub(crate) fn take_changes(&mut self) -> ChangeLog {
        std::mem::take(&mut self.changes)
    }

    fn next_insertion(&mut self) -> u64 {
        let next = self.insertion_counter;
        self.insertion_counter += 1;
        next
    }

    fn sorted_position(&self, siblings: &[TestId], node: &TestNode) -> usize {
        siblings.partition_point(|sibling_id| {
            let sibling = self
                .nodes
                .get(sibling_id)
                .expect("sibling ids always resolve");
            sibling_order(sibling, node) == Ordering::Less
        })
    }

    fn reposition(&mut self, id: &TestId) {
        match id.parent() {
            None => {
                self.roots.retain(|root| root != id);
                let pos = self.sorted_position(&self.roots, &self.nodes[id]);
                self.roots.insert(pos, id.clone());
                self.changes.children_changed.insert(None);
            }
            Some(parent_id) => {
                let parent = self
                    .nodes
                    .get_mut(&parent_id)
                    .expect("a stored child's parent is stored");
                parent.children.retain(|child| child != id);
                let pos =
                    self.sorted_position(&self.nodes[&parent_id].children, &self.nodes[id]);
                self.nodes
                    .get_mut(&parent_id)
                    .expect("a stored child's parent is stored")
                    .children
                    .insert(pos, id.clone());
                self.changes.children_changed.insert(Some(parent_id));
            }
        }
    }

    fn collect_postorder(&self, id: &TestId, out: &mut Vec<TestId>) {
        if let Some(node) = self.nodes.get(id) {
            for child in &node.children {
                self.collect_postorder(child, out);
            }
        }
        out.push(id.clone());
    }
}
