// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    events::ResultLookup,
    projection::{
        bridge::{ElementId, ProjectionBridge, TreeControl, TreeElement},
        store::NodeStore,
    },
};
use debug_ignore::DebugIgnore;
use testtree_metadata::{ExpandState, SavedTreeState, TestId};

/// Live projection of a test tree fed by a membership diff stream and a
/// result-state change stream.
///
/// Construction injects the result lookup service; the tree control is
/// passed into each entry point so the projection never holds a stale
/// control across flushes. Each diff batch or state notification runs to
/// completion and invokes the control once.
#[derive(Debug)]
pub struct TestTreeProjection {
    pub(super) store: NodeStore,
    pub(super) bridge: ProjectionBridge,
    pub(super) results: DebugIgnore<Box<dyn ResultLookup>>,
    pub(super) saved: SavedTreeState,
}

impl TestTreeProjection {
    /// Creates an empty projection over the given result service.
    pub fn new(results: Box<dyn ResultLookup>) -> Self {
        Self::with_saved_state(results, SavedTreeState::default())
    }

    /// Creates an empty projection, seeding initial expand/collapse state of
    /// incoming items from a persisted preference.
    pub fn with_saved_state(results: Box<dyn ResultLookup>, saved: SavedTreeState) -> Self {
        Self {
            store: NodeStore::new(),
            bridge: ProjectionBridge::default(),
            results: DebugIgnore(results),
            saved,
        }
    }

    /// Read access to the projected tree.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Returns the rendered element for a serialized id, if that item is
    /// currently materialized in the control. Synthetic error leaves are
    /// never returned: they are outside the diff stream's identifier space.
    pub fn element_by_test_id(&self, id_str: &str) -> Option<&TreeElement> {
        let id: TestId = id_str.parse().ok()?;
        self.bridge.element_by_test_id(&id)
    }

    /// Forces a full materialization of the currently visible tree (and any
    /// pending visible changes) into the given control.
    pub fn apply_to(&mut self, control: &mut dyn TreeControl) {
        // Fold any not-yet-flushed store changes into the same pass.
        let changes = self.store.take_changes();
        if !changes.is_empty() {
            self.bridge.flush(&self.store, changes, control);
        }
        self.bridge.apply_to(&self.store, control);
    }

    /// Expands a node, materializing its subtree in one pass if it is
    /// visible. Returns false if the id is unknown, not expandable, or
    /// already expanded.
    pub fn expand(&mut self, id: &TestId, control: &mut dyn TreeControl) -> bool {
        match self.store.get(id).map(|node| node.expand()) {
            Some(ExpandState::Expandable) => {}
            _ => return false,
        }
        self.store.set_expand(id, ExpandState::Expanded);
        self.bridge.note_expand(id, ExpandState::Expanded);
        if self.bridge.is_visible(&self.store, id) {
            control.set_collapsible_state(&ElementId::Item(id.clone()), ExpandState::Expanded);
            self.bridge.materialize_subtree(&self.store, id, control);
        }
        true
    }

    /// Collapses an expanded node. Returns false if the id is unknown or not
    /// currently expanded.
    pub fn collapse(&mut self, id: &TestId, control: &mut dyn TreeControl) -> bool {
        match self.store.get(id).map(|node| node.expand()) {
            Some(ExpandState::Expanded) => {}
            _ => return false,
        }
        self.store.set_expand(id, ExpandState::Expandable);
        self.bridge.note_expand(id, ExpandState::Expandable);
        if self.bridge.is_visible(&self.store, id) {
            control.set_collapsible_state(&ElementId::Item(id.clone()), ExpandState::Expandable);
        }
        self.bridge.drop_hidden_subtree(&self.store, id);
        true
    }

    /// Exports the current expand/collapse state in the persisted preference
    /// format.
    pub fn saved_state(&self) -> SavedTreeState {
        let mut saved = SavedTreeState::default();
        for node in self.store.iter() {
            if node.expand().can_expand() {
                saved.set_collapsed(node.id(), !node.expand().is_expanded());
            }
        }
        saved
    }

    pub(super) fn flush(&mut self, control: &mut dyn TreeControl) {
        let changes = self.store.take_changes();
        if !changes.is_empty() {
            self.bridge.flush(&self.store, changes, control);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{events::NoResults, projection::test_helpers::RecordingControl};
    use pretty_assertions::assert_eq;
    use testtree_metadata::{TestDiffOp, TestItemDescription, TestItemSummary};

    fn id(segments: &[&str]) -> TestId {
        TestId::from_segments(segments.iter().copied()).unwrap()
    }

    fn add_op(segments: &[&str], label: &str) -> TestDiffOp {
        TestDiffOp::Add {
            controller_id: segments[0].into(),
            expand: ExpandState::NotExpandable,
            item: TestItemDescription {
                id: id(segments),
                summary: TestItemSummary::new(label),
            },
        }
    }

    #[test]
    fn test_element_by_test_id() {
        let mut projection = TestTreeProjection::new(Box::new(NoResults));
        let mut control = RecordingControl::new();
        projection.apply_diff(
            vec![add_op(&["ctrl"], "ctrl"), add_op(&["ctrl", "a"], "a")],
            &mut control,
        );

        let root = projection.element_by_test_id("ctrl").unwrap();
        assert_eq!(root.label, "ctrl");
        assert_eq!(root.expand, ExpandState::Expandable);

        // Not yet materialized: the root is collapsed.
        assert_eq!(projection.element_by_test_id("ctrl\0a"), None);
        projection.expand(&id(&["ctrl"]), &mut control);
        assert_eq!(projection.element_by_test_id("ctrl\0a").unwrap().label, "a");

        // Unparseable and unknown ids resolve to nothing.
        assert_eq!(projection.element_by_test_id(""), None);
        assert_eq!(projection.element_by_test_id("nope"), None);
    }

    #[test]
    fn test_expand_collapse_round_trip() {
        let mut projection = TestTreeProjection::new(Box::new(NoResults));
        let mut control = RecordingControl::new();
        projection.apply_diff(
            vec![add_op(&["ctrl"], "ctrl"), add_op(&["ctrl", "a"], "a")],
            &mut control,
        );

        assert!(projection.expand(&id(&["ctrl"]), &mut control));
        // Second expand is a no-op.
        assert!(!projection.expand(&id(&["ctrl"]), &mut control));
        assert_eq!(control.children_labels(Some(&id(&["ctrl"]))), ["a"]);

        assert!(projection.collapse(&id(&["ctrl"]), &mut control));
        assert!(!projection.collapse(&id(&["ctrl"]), &mut control));
        // The child's rendered snapshot is gone until the next expand.
        assert_eq!(projection.element_by_test_id("ctrl\0a"), None);

        // Leaves can never expand.
        projection.expand(&id(&["ctrl"]), &mut control);
        assert!(!projection.expand(&id(&["ctrl", "a"]), &mut control));
    }

    #[test]
    fn test_saved_state_round_trip() {
        let mut projection = TestTreeProjection::new(Box::new(NoResults));
        let mut control = RecordingControl::new();
        projection.apply_diff(
            vec![
                add_op(&["ctrl"], "ctrl"),
                add_op(&["ctrl", "a"], "a"),
                add_op(&["ctrl", "a", "aa"], "aa"),
            ],
            &mut control,
        );
        projection.expand(&id(&["ctrl"]), &mut control);

        let saved = projection.saved_state();
        assert_eq!(saved.is_collapsed(&id(&["ctrl"])), Some(false));
        assert_eq!(saved.is_collapsed(&id(&["ctrl", "a"])), Some(true));

        // Seeding a fresh projection from the export reproduces the
        // expansion even though the provider announces everything collapsed.
        let mut reseeded = TestTreeProjection::with_saved_state(Box::new(NoResults), saved);
        let mut control = RecordingControl::new();
        reseeded.apply_diff(
            vec![
                TestDiffOp::Add {
                    controller_id: "ctrl".into(),
                    expand: ExpandState::Expandable,
                    item: TestItemDescription {
                        id: id(&["ctrl"]),
                        summary: TestItemSummary::new("ctrl"),
                    },
                },
                add_op(&["ctrl", "a"], "a"),
            ],
            &mut control,
        );
        assert_eq!(
            reseeded.store().get(&id(&["ctrl"])).unwrap().expand(),
            ExpandState::Expanded
        );
    }

    #[test]
    fn test_apply_to_fresh_control() {
        let mut projection = TestTreeProjection::new(Box::new(NoResults));
        let mut control = RecordingControl::new();
        projection.apply_diff(
            vec![
                add_op(&["ctrl"], "ctrl"),
                add_op(&["ctrl", "a"], "a"),
                add_op(&["ctrl", "b"], "b"),
            ],
            &mut control,
        );
        projection.expand(&id(&["ctrl"]), &mut control);

        // A brand-new control receives the whole visible tree in one pass.
        let mut fresh = RecordingControl::new();
        projection.apply_to(&mut fresh);
        assert_eq!(fresh.children_labels(None), ["ctrl"]);
        assert_eq!(fresh.children_labels(Some(&id(&["ctrl"]))), ["a", "b"]);
    }
}
