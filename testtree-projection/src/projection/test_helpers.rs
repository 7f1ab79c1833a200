// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test-only fake tree control that records every call.

use crate::projection::bridge::{ElementId, TreeControl, TreeElement};
use std::collections::BTreeMap;
use testtree_metadata::{ExpandState, TestId, TestResultState};

/// One recorded call against the fake control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ControlCall {
    SetChildren {
        parent: Option<TestId>,
        labels: Vec<String>,
    },
    SetLabel {
        element: ElementId,
        label: String,
    },
    SetCollapsibleState {
        element: ElementId,
        state: ExpandState,
    },
    RequestRender {
        element: ElementId,
        state: TestResultState,
    },
}

/// A [`TreeControl`] that records calls and keeps the last child list pushed
/// for each parent, so tests can assert on the rendered structure.
#[derive(Debug, Default)]
pub(crate) struct RecordingControl {
    pub(crate) calls: Vec<ControlCall>,
    children: BTreeMap<Option<TestId>, Vec<TreeElement>>,
}

impl RecordingControl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Labels of the last child list pushed for `parent`.
    pub(crate) fn children_labels(&self, parent: Option<&TestId>) -> Vec<String> {
        self.children
            .get(&parent.cloned())
            .map(|elements| elements.iter().map(|element| element.label.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of recorded root-list pushes.
    pub(crate) fn root_list_pushes(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, ControlCall::SetChildren { parent: None, .. }))
            .count()
    }

    /// States delivered via repaint requests, by item id, last write wins.
    pub(crate) fn rendered_states(&self) -> BTreeMap<TestId, TestResultState> {
        let mut states = BTreeMap::new();
        for call in &self.calls {
            if let ControlCall::RequestRender {
                element: ElementId::Item(id),
                state,
            } = call
            {
                states.insert(id.clone(), *state);
            }
        }
        states
    }

    /// Forgets recorded calls, keeping the rendered child lists.
    pub(crate) fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl TreeControl for RecordingControl {
    fn set_children(&mut self, parent: Option<&TestId>, children: Vec<TreeElement>) {
        self.calls.push(ControlCall::SetChildren {
            parent: parent.cloned(),
            labels: children.iter().map(|element| element.label.clone()).collect(),
        });
        self.children.insert(parent.cloned(), children);
    }

    fn set_label(&mut self, element: &ElementId, label: &str) {
        self.calls.push(ControlCall::SetLabel {
            element: element.clone(),
            label: label.to_owned(),
        });
    }

    fn set_collapsible_state(&mut self, element: &ElementId, state: ExpandState) {
        self.calls.push(ControlCall::SetCollapsibleState {
            element: element.clone(),
            state,
        });
    }

    fn request_render(&mut self, element: &TreeElement) {
        self.calls.push(ControlCall::RequestRender {
            element: element.id.clone(),
            state: element.state,
        });
    }
}
