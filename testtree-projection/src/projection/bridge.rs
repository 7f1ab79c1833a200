// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::projection::store::{ChangeLog, NodeStore, TestNode};
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use testtree_metadata::{ExpandState, SourceRange, TestId, TestResultState};
use tracing::trace;

/// Identity of a rendered element: a real test item, or the synthetic error
/// leaf rendered under one.
///
/// The error leaf is keyed by its owning item, so it can never collide with
/// the identifier space the diff stream addresses.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementId {
    /// A real item addressed by the diff stream.
    Item(TestId),
    /// The synthetic error leaf of an item.
    ErrorOf(TestId),
}

impl ElementId {
    /// The real item id, or `None` for a synthetic element.
    pub fn test_id(&self) -> Option<&TestId> {
        match self {
            ElementId::Item(id) => Some(id),
            ElementId::ErrorOf(_) => None,
        }
    }

    /// The item this element belongs to: itself, or the owner of a synthetic
    /// error leaf.
    pub fn owner(&self) -> &TestId {
        match self {
            ElementId::Item(id) | ElementId::ErrorOf(id) => id,
        }
    }

    /// Returns true for elements that only exist in the rendered projection.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, ElementId::ErrorOf(_))
    }
}

/// Snapshot of one row as pushed into the tree control.
///
/// Snapshots are rebuilt from the store on every flush; the control never
/// holds live references into the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeElement {
    /// Identity of the row.
    pub id: ElementId,
    /// Display label. For an error leaf, the error text.
    pub label: String,
    /// Displayed (computed) result state.
    pub state: TestResultState,
    /// Collapsible tri-state of the row.
    pub expand: ExpandState,
    /// Source file, if known.
    pub uri: Option<Utf8PathBuf>,
    /// Location within `uri`.
    pub range: Option<SourceRange>,
}

impl TreeElement {
    pub(crate) fn for_node(node: &TestNode) -> Self {
        Self {
            id: ElementId::Item(node.id().clone()),
            label: node.label().to_owned(),
            state: node.computed_state(),
            expand: node.expand(),
            uri: node.summary().uri.clone(),
            range: node.summary().range,
        }
    }

    pub(crate) fn error_of(node: &TestNode, error: &str) -> Self {
        Self {
            id: ElementId::ErrorOf(node.id().clone()),
            label: error.to_owned(),
            state: TestResultState::Unset,
            expand: ExpandState::NotExpandable,
            uri: node.summary().uri.clone(),
            range: node.summary().range,
        }
    }
}

/// The capability set required of a host tree control.
///
/// Any concrete UI toolkit implements this; the projection drives it with
/// complete child lists and fresh element snapshots, never partial splices.
pub trait TreeControl {
    /// Replaces the ordered child list of `parent` (`None` for the root
    /// level) with `children`.
    fn set_children(&mut self, parent: Option<&TestId>, children: Vec<TreeElement>);

    /// Updates the label of an already-rendered element.
    fn set_label(&mut self, element: &ElementId, label: &str);

    /// Updates the collapsible tri-state of an already-rendered element.
    fn set_collapsible_state(&mut self, element: &ElementId, state: ExpandState);

    /// Repaints an already-rendered element with a fresh snapshot.
    fn request_render(&mut self, element: &TreeElement);
}

/// Translates store deltas into tree-control calls.
///
/// The bridge holds only non-owning state: snapshots of rendered rows keyed
/// by id, and the set of ids whose rendering is stale because they were
/// invisible when they changed. It re-reads the store on every flush.
#[derive(Debug, Default)]
pub(crate) struct ProjectionBridge {
    rendered: IndexMap<TestId, TreeElement>,
    pending: BTreeSet<TestId>,
}

impl ProjectionBridge {
    /// The rendered snapshot for a real item id, if it is materialized.
    pub(crate) fn element_by_test_id(&self, id: &TestId) -> Option<&TreeElement> {
        self.rendered.get(id)
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> &BTreeSet<TestId> {
        &self.pending
    }

    /// A node is visible when every ancestor is expanded. Roots are always
    /// visible.
    pub(crate) fn is_visible(&self, store: &NodeStore, id: &TestId) -> bool {
        id.ancestors()
            .all(|ancestor| store.get(&ancestor).is_some_and(|node| node.expand().is_expanded()))
    }

    /// Applies one drained change log to the control. Invisible changes are
    /// recorded as pending and materialized later in one pass.
    pub(crate) fn flush(
        &mut self,
        store: &NodeStore,
        changes: ChangeLog,
        control: &mut dyn TreeControl,
    ) {
        for removed in &changes.removed {
            self.rendered.shift_remove(removed);
            self.pending.remove(removed);
        }

        // BTreeSet order puts `None` (the root list) first and ancestors
        // before descendants, so parent rows exist before children render.
        for parent in &changes.children_changed {
            match parent {
                None => self.push_children(store, None, control),
                Some(parent_id) => {
                    let Some(node) = store.get(parent_id) else {
                        continue;
                    };
                    if self.is_visible(store, parent_id) {
                        let element_id = ElementId::Item(parent_id.clone());
                        control.set_collapsible_state(&element_id, node.expand());
                        if let Some(element) = self.rendered.get_mut(parent_id) {
                            element.expand = node.expand();
                        }
                        match node.expand() {
                            ExpandState::Expanded => {
                                self.push_children(store, Some(parent_id), control);
                            }
                            ExpandState::NotExpandable => {
                                // The subtree vanished entirely; clear any
                                // rows the control still holds for it.
                                self.push_children(store, Some(parent_id), control);
                            }
                            ExpandState::Expandable => {
                                // Collapsed: the flag is current, the child
                                // rows are not.
                                self.pending.insert(parent_id.clone());
                            }
                        }
                    } else {
                        self.pending.insert(parent_id.clone());
                    }
                }
            }
        }

        for id in &changes.attrs_changed {
            let Some(node) = store.get(id) else {
                continue;
            };
            if self.is_visible(store, id) {
                if let Some(element) = self.rendered.get_mut(id) {
                    if element.label != node.label() {
                        element.label = node.label().to_owned();
                        control.set_label(&ElementId::Item(id.clone()), node.label());
                    }
                    element.uri = node.summary().uri.clone();
                    element.range = node.summary().range;
                }
            } else {
                self.pending.insert(id.clone());
            }
        }

        for id in &changes.state_changed {
            let Some(node) = store.get(id) else {
                continue;
            };
            if self.is_visible(store, id) {
                if let Some(element) = self.rendered.get_mut(id) {
                    element.state = node.computed_state();
                    let snapshot = element.clone();
                    control.request_render(&snapshot);
                }
            } else {
                self.pending.insert(id.clone());
            }
        }
    }

    /// Records an expand-state change on the rendered snapshot, if present.
    pub(crate) fn note_expand(&mut self, id: &TestId, expand: ExpandState) {
        if let Some(element) = self.rendered.get_mut(id) {
            element.expand = expand;
        }
    }

    /// One full materialization pass over an expanded subtree. Intermediate
    /// states were never observably rendered, so there is no per-missed-diff
    /// catch-up.
    pub(crate) fn materialize_subtree(
        &mut self,
        store: &NodeStore,
        id: &TestId,
        control: &mut dyn TreeControl,
    ) {
        self.pending.remove(id);
        let Some(node) = store.get(id) else {
            return;
        };
        if !node.expand().is_expanded() {
            return;
        }
        trace!(id = %id, "materializing subtree");
        self.push_children(store, Some(id), control);
        let children: Vec<TestId> = node.children().to_vec();
        for child in &children {
            self.pending.remove(child);
            if store.get(child).is_some_and(|c| c.expand().is_expanded()) {
                self.materialize_subtree(store, child, control);
            }
        }
    }

    /// Forces a full materialization of the visible tree into the control.
    pub(crate) fn apply_to(&mut self, store: &NodeStore, control: &mut dyn TreeControl) {
        self.push_children(store, None, control);
        let roots: Vec<TestId> = store.roots().to_vec();
        for root in &roots {
            self.pending.remove(root);
            if store.get(root).is_some_and(|node| node.expand().is_expanded()) {
                self.materialize_subtree(store, root, control);
            }
        }
    }

    /// Drops rendered snapshots for the strict descendants of a node that
    /// just collapsed; they re-materialize on the next expand.
    pub(crate) fn drop_hidden_subtree(&mut self, store: &NodeStore, id: &TestId) {
        let children: Vec<TestId> = store.children(id).to_vec();
        for child in children {
            self.rendered.shift_remove(&child);
            self.drop_hidden_subtree(store, &child);
        }
    }

    fn push_children(
        &mut self,
        store: &NodeStore,
        parent: Option<&TestId>,
        control: &mut dyn TreeControl,
    ) {
        let elements = match parent {
            None => store
                .roots()
                .iter()
                .filter_map(|id| store.get(id))
                .map(TreeElement::for_node)
                .collect::<Vec<_>>(),
            Some(parent_id) => {
                let Some(node) = store.get(parent_id) else {
                    return;
                };
                Self::child_elements(store, node)
            }
        };
        for element in &elements {
            if let ElementId::Item(id) = &element.id {
                self.rendered.insert(id.clone(), element.clone());
            }
        }
        control.set_children(parent, elements);
    }

    fn child_elements(store: &NodeStore, node: &TestNode) -> Vec<TreeElement> {
        let mut elements = Vec::with_capacity(node.children().len() + 1);
        // The error leaf always sorts before real children.
        if let Some(error) = node.error() {
            elements.push(TreeElement::error_of(node, error));
        }
        for child_id in node.children() {
            if let Some(child) = store.get(child_id) {
                elements.push(TreeElement::for_node(child));
            }
        }
        elements
    }
}
