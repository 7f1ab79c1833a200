// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event channels and the result lookup seam.
//!
//! The host delivers two independent event streams: membership diff batches
//! and result-state change notifications. Each kind gets its own FIFO queue;
//! [`EventQueue::drain_into`] serializes both onto the projection on the
//! host's single-threaded event loop.

use crate::projection::{TestTreeProjection, TreeControl};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use testtree_metadata::{TestDiffBatch, TestId, TestResultState};

/// A test item's result pair as reported by the result service: its directly
/// observed state and the service's rollup over its subtree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    /// The state observed directly on the item.
    pub own_state: TestResultState,

    /// The service-computed rollup for the item's subtree.
    pub computed_state: TestResultState,
}

/// Why a state-change notification was emitted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateChangeReason {
    /// The item's own state transitioned.
    OwnStateChange,
    /// Only the item's computed rollup changed.
    ComputedStateChange,
}

/// A notification that a test item's result state changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangeEvent {
    /// The item whose state changed.
    pub id: TestId,

    /// The item's new result pair.
    pub result: ItemResult,

    /// The own state before the transition.
    pub previous: TestResultState,

    /// Why the notification was emitted.
    pub reason: StateChangeReason,
}

/// Query-by-id access to the result service, injected into the projection at
/// construction time. Used for the initial render of newly added items and
/// for on-demand refresh.
pub trait ResultLookup {
    /// Returns the current result pair for an item, or `None` if the service
    /// has no record of it.
    fn state_of(&self, id: &TestId) -> Option<ItemResult>;
}

impl<F> ResultLookup for F
where
    F: Fn(&TestId) -> Option<ItemResult>,
{
    fn state_of(&self, id: &TestId) -> Option<ItemResult> {
        self(id)
    }
}

/// A result lookup with no records; items start out unset.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoResults;

impl ResultLookup for NoResults {
    fn state_of(&self, _id: &TestId) -> Option<ItemResult> {
        None
    }
}

/// One FIFO queue per inbound event kind.
///
/// Within a kind, delivery order is preserved. Draining applies all queued
/// diff batches first, then all state changes: a state change for an id whose
/// Add is queued behind it would be dropped either way, while the reverse
/// order can only lose notifications.
#[derive(Debug, Default)]
pub struct EventQueue {
    diff_batches: VecDeque<TestDiffBatch>,
    state_changes: VecDeque<StateChangeEvent>,
}

impl EventQueue {
    /// Creates an empty queue pair.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a membership diff batch.
    pub fn push_diff_batch(&mut self, batch: TestDiffBatch) {
        self.diff_batches.push_back(batch);
    }

    /// Enqueues a state-change notification.
    pub fn push_state_change(&mut self, event: StateChangeEvent) {
        self.state_changes.push_back(event);
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.diff_batches.is_empty() && self.state_changes.is_empty()
    }

    /// Drains all queued events into the projection, flushing the control
    /// once per batch and once per state change.
    pub fn drain_into(
        &mut self,
        projection: &mut TestTreeProjection,
        control: &mut dyn TreeControl,
    ) {
        while let Some(batch) = self.diff_batches.pop_front() {
            projection.apply_diff(batch, control);
        }
        while let Some(event) = self.state_changes.pop_front() {
            projection.handle_state_change(event, control);
        }
    }
}
