// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diff batch application and result-state propagation.
//!
//! A batch is applied atomically with respect to the control: all Adds, then
//! all Updates, then all Removes mutate the store, and the bridge runs once.
//! Malformed operations are logged and skipped; nothing here returns an
//! error or panics on bad input, since the stream is authoritative and
//! best-effort eventually-consistent.

use crate::{
    events::StateChangeEvent,
    projection::{TestTreeProjection, TreeControl},
};
use smol_str::SmolStr;
use testtree_metadata::{
    ExpandState, TestDiffBatch, TestDiffOp, TestId, TestItemDescription, TestItemPatch,
    TestResultState,
};
use tracing::{debug, warn};

impl TestTreeProjection {
    /// Applies one membership diff batch and flushes the control once.
    pub fn apply_diff(&mut self, batch: TestDiffBatch, control: &mut dyn TreeControl) {
        let mut adds = Vec::new();
        let mut updates = Vec::new();
        let mut removes = Vec::new();
        for op in batch {
            match op {
                TestDiffOp::Add {
                    controller_id,
                    expand,
                    item,
                } => adds.push((controller_id, expand, item)),
                TestDiffOp::Update { ext_id, patch } => updates.push((ext_id, patch)),
                TestDiffOp::Remove { ext_id } => removes.push(ext_id),
            }
        }
        debug!(
            adds = adds.len(),
            updates = updates.len(),
            removes = removes.len(),
            "applying diff batch"
        );

        for (controller_id, expand, item) in adds {
            self.apply_add(&controller_id, expand, item);
        }
        for (ext_id, patch) in updates {
            self.apply_update(&ext_id, &patch);
        }
        for ext_id in removes {
            self.apply_remove(&ext_id);
        }
        self.flush(control);
    }

    /// Applies a state-change notification: sets the item's own and computed
    /// states, then recomputes ancestors' rollups, stopping as soon as one is
    /// unchanged. Unknown ids are ignored.
    pub fn handle_state_change(
        &mut self,
        event: StateChangeEvent,
        control: &mut dyn TreeControl,
    ) {
        if !self.store.contains(&event.id) {
            debug!(id = %event.id, "ignoring state change for unknown id");
            return;
        }
        let computed_changed = self.store.set_states(
            &event.id,
            event.result.own_state,
            event.result.computed_state,
        );
        if computed_changed {
            let mut current = event.id.parent();
            while let Some(ancestor) = current {
                let rollup = self.rollup(&ancestor);
                if !self.store.set_computed_state(&ancestor, rollup) {
                    break;
                }
                current = ancestor.parent();
            }
        }
        self.flush(control);
    }

    /// Re-queries the result service for every stored item and re-renders
    /// whatever changed, in one flush.
    pub fn refresh_states(&mut self, control: &mut dyn TreeControl) {
        let ids: Vec<TestId> = self.store.iter().map(|node| node.id().clone()).collect();
        for id in ids {
            let result = self.results.state_of(&id).unwrap_or_default();
            self.store
                .set_states(&id, result.own_state, result.computed_state);
        }
        self.flush(control);
    }

    fn apply_add(&mut self, controller_id: &SmolStr, expand: ExpandState, item: TestItemDescription) {
        let TestItemDescription { id, summary } = item;
        if id.controller_id() != controller_id.as_str() {
            warn!(
                id = %id,
                controller_id = %controller_id,
                "add announces a controller that does not match its id; trusting the id"
            );
        }
        let initial = self.results.state_of(&id).unwrap_or_default();
        let expand = self.seeded_expand(&id, expand);
        if !self.store.upsert(id.clone(), summary, expand, initial) {
            warn!(id = %id, "dropping add whose parent is unknown");
        }
    }

    fn apply_update(&mut self, ext_id: &TestId, patch: &TestItemPatch) {
        if !self.store.update(ext_id, patch) {
            warn!(id = %ext_id, "dropping update for unknown id");
        }
    }

    fn apply_remove(&mut self, ext_id: &TestId) {
        if self.store.remove(ext_id).is_empty() {
            warn!(id = %ext_id, "dropping remove for unknown id");
        }
    }

    /// Initial expand state for a new item: the persisted preference, where
    /// one exists, overrides the provider's announcement.
    fn seeded_expand(&self, id: &TestId, provided: ExpandState) -> ExpandState {
        if !provided.can_expand() {
            return provided;
        }
        match self.saved.is_collapsed(id) {
            Some(true) => ExpandState::Expandable,
            Some(false) => ExpandState::Expanded,
            None => provided,
        }
    }

    /// Rollup of a node's displayed state: the worst of its own state and
    /// its children's computed states. If every child is unset, the node
    /// falls back to its own last directly observed state, so a cleared run
    /// does not flicker a still-valid parent result away.
    fn rollup(&self, id: &TestId) -> TestResultState {
        let node = self.store.get(id).expect("rollup walks stored ancestors");
        if node.is_leaf() {
            return node.own_state();
        }
        let mut worst = TestResultState::Skipped;
        let mut all_unset = true;
        for child_id in node.children() {
            let Some(child) = self.store.get(child_id) else {
                continue;
            };
            let child_state = child.computed_state();
            if child_state != TestResultState::Unset {
                all_unset = false;
            }
            worst = worst.max_priority(child_state);
        }
        if all_unset {
            node.own_state()
        } else {
            node.own_state().max_priority(worst)
        }
    }
}
