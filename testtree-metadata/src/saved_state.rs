// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::SavedTreeStateError, test_id::TestId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted expand/collapse preference for the tree, keyed by path segment.
///
/// This is a UI preference consumed only to seed initial expand state; the
/// projection does not otherwise process it. The root value is the anonymous
/// container above the controllers, so a controller's entry lives in
/// `children` keyed by its controller id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTreeState {
    /// Whether this node was collapsed. `None` means no preference recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,

    /// Saved state of children, keyed by path segment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, SavedTreeState>,
}

impl SavedTreeState {
    /// Decodes saved state from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, SavedTreeStateError> {
        serde_json::from_str(json).map_err(SavedTreeStateError::new)
    }

    /// Encodes this state as compact JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Returns the saved entry for an id, walking its path segments.
    pub fn lookup(&self, id: &TestId) -> Option<&SavedTreeState> {
        let mut node = self;
        for segment in id.segments() {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Returns the recorded collapsed flag for an id, if any.
    pub fn is_collapsed(&self, id: &TestId) -> Option<bool> {
        self.lookup(id)?.collapsed
    }

    /// Records the collapsed flag for an id, creating intermediate entries.
    pub fn set_collapsed(&mut self, id: &TestId, collapsed: bool) {
        let mut node = self;
        for segment in id.segments() {
            node = node.children.entry(segment.to_owned()).or_default();
        }
        node.collapsed = Some(collapsed);
    }

    /// Returns true if no preference is recorded anywhere in this subtree.
    pub fn is_empty(&self) -> bool {
        self.collapsed.is_none() && self.children.values().all(Self::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn id(segments: &[&str]) -> TestId {
        TestId::from_segments(segments.iter().copied()).unwrap()
    }

    #[test]
    fn test_decode_and_lookup() {
        let json = indoc! {r#"
            {
                "children": {
                    "ctrl": {
                        "collapsed": false,
                        "children": {
                            "suite": { "collapsed": true }
                        }
                    }
                }
            }
        "#};
        let state = SavedTreeState::from_json(json).unwrap();
        assert_eq!(state.is_collapsed(&id(&["ctrl"])), Some(false));
        assert_eq!(state.is_collapsed(&id(&["ctrl", "suite"])), Some(true));
        assert_eq!(state.is_collapsed(&id(&["ctrl", "other"])), None);
        assert_eq!(state.is_collapsed(&id(&["missing"])), None);
    }

    #[test]
    fn test_set_and_round_trip() {
        let mut state = SavedTreeState::default();
        assert!(state.is_empty());

        state.set_collapsed(&id(&["ctrl", "suite"]), true);
        state.set_collapsed(&id(&["ctrl"]), false);
        assert!(!state.is_empty());

        let json = state.to_json().unwrap();
        let parsed = SavedTreeState::from_json(&json).unwrap();
        assert_eq!(parsed, state);
        // The intermediate entry for "ctrl" holds both its own flag and the
        // nested suite entry.
        assert_eq!(parsed.is_collapsed(&id(&["ctrl"])), Some(false));
        assert_eq!(parsed.is_collapsed(&id(&["ctrl", "suite"])), Some(true));
    }

    #[test]
    fn test_invalid_json() {
        assert!(SavedTreeState::from_json("{").is_err());
    }
}
