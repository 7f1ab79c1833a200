// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::TestResultStateParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Result state of a test item, as displayed in the tree.
///
/// `Unset` is the state of an item that has never run (or whose results were
/// cleared). The remaining states come from the result lookup service and the
/// state-change notification stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestResultState {
    /// No result has been observed.
    #[default]
    Unset,
    /// The item is queued for execution.
    Queued,
    /// The item is currently running.
    Running,
    /// The item passed.
    Passed,
    /// The item failed.
    Failed,
    /// An error occurred outside of an ordinary test failure, for example a
    /// harness crash.
    Errored,
    /// The item was skipped.
    Skipped,
}

impl TestResultState {
    /// All states, in declaration order.
    pub const ALL: [TestResultState; 7] = [
        TestResultState::Unset,
        TestResultState::Queued,
        TestResultState::Running,
        TestResultState::Passed,
        TestResultState::Failed,
        TestResultState::Errored,
        TestResultState::Skipped,
    ];

    /// Rollup priority of this state. Higher priority wins when aggregating a
    /// node's displayed state from its own result and its children's.
    ///
    /// In-flight states outrank settled ones so a re-running subtree reads as
    /// running; `Errored` outranks `Failed`; `Skipped` sits below `Unset` so
    /// a fully skipped subtree never masks a parent's own result.
    pub fn priority(self) -> u8 {
        match self {
            TestResultState::Running => 6,
            TestResultState::Errored => 5,
            TestResultState::Failed => 4,
            TestResultState::Queued => 3,
            TestResultState::Passed => 2,
            TestResultState::Unset => 1,
            TestResultState::Skipped => 0,
        }
    }

    /// Returns the higher-priority of two states.
    pub fn max_priority(self, other: Self) -> Self {
        if other.priority() > self.priority() {
            other
        } else {
            self
        }
    }

    /// Returns true for failure-indicating states.
    pub fn is_failure(self) -> bool {
        matches!(self, TestResultState::Failed | TestResultState::Errored)
    }

    /// Returns true for states that represent a finished run.
    pub fn is_done(self) -> bool {
        matches!(
            self,
            TestResultState::Passed
                | TestResultState::Failed
                | TestResultState::Errored
                | TestResultState::Skipped
        )
    }

    /// Returns the kebab-case form of this state.
    pub fn as_str(self) -> &'static str {
        match self {
            TestResultState::Unset => "unset",
            TestResultState::Queued => "queued",
            TestResultState::Running => "running",
            TestResultState::Passed => "passed",
            TestResultState::Failed => "failed",
            TestResultState::Errored => "errored",
            TestResultState::Skipped => "skipped",
        }
    }

    pub(crate) fn variants() -> [&'static str; 7] {
        Self::ALL.map(Self::as_str)
    }
}

impl fmt::Display for TestResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TestResultState {
    type Err = TestResultStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| TestResultStateParseError::new(s))
    }
}

/// Whether a tree item can be, or has been, expanded.
///
/// Mirrors whether children have been requested from the provider: an item
/// becomes `Expandable` when its first child is added, and `Expanded` once
/// the host has opened it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpandState {
    /// The item has no children to reveal.
    #[default]
    NotExpandable,
    /// The item has children, currently collapsed.
    Expandable,
    /// The item is open and its children are rendered.
    Expanded,
}

impl ExpandState {
    /// Returns true if the item is currently expanded.
    pub fn is_expanded(self) -> bool {
        matches!(self, ExpandState::Expanded)
    }

    /// Returns true if the item has children to reveal.
    pub fn can_expand(self) -> bool {
        matches!(self, ExpandState::Expandable | ExpandState::Expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_priority_total_order() {
        // Worst-wins order, highest first.
        let expected = [
            TestResultState::Running,
            TestResultState::Errored,
            TestResultState::Failed,
            TestResultState::Queued,
            TestResultState::Passed,
            TestResultState::Unset,
            TestResultState::Skipped,
        ];
        for pair in expected.windows(2) {
            assert!(
                pair[0].priority() > pair[1].priority(),
                "{} should outrank {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_max_priority() {
        assert_eq!(
            TestResultState::Failed.max_priority(TestResultState::Unset),
            TestResultState::Failed
        );
        assert_eq!(
            TestResultState::Unset.max_priority(TestResultState::Failed),
            TestResultState::Failed
        );
        assert_eq!(
            TestResultState::Passed.max_priority(TestResultState::Running),
            TestResultState::Running
        );
        assert_eq!(
            TestResultState::Unset.max_priority(TestResultState::Skipped),
            TestResultState::Unset
        );
    }

    #[test_case(TestResultState::Unset, "unset")]
    #[test_case(TestResultState::Queued, "queued")]
    #[test_case(TestResultState::Running, "running")]
    #[test_case(TestResultState::Passed, "passed")]
    #[test_case(TestResultState::Failed, "failed")]
    #[test_case(TestResultState::Errored, "errored")]
    #[test_case(TestResultState::Skipped, "skipped")]
    fn test_state_string_round_trip(state: TestResultState, s: &str) {
        assert_eq!(state.to_string(), s);
        assert_eq!(s.parse::<TestResultState>().unwrap(), state);
        assert_eq!(serde_json::to_string(&state).unwrap(), format!("\"{s}\""));
    }

    #[test]
    fn test_state_parse_error() {
        let err = "pass".parse::<TestResultState>().unwrap_err();
        assert!(err.to_string().contains("known values"));
    }

    #[test]
    fn test_expand_state_predicates() {
        assert!(!ExpandState::NotExpandable.can_expand());
        assert!(ExpandState::Expandable.can_expand());
        assert!(ExpandState::Expanded.can_expand());
        assert!(ExpandState::Expanded.is_expanded());
        assert!(!ExpandState::Expandable.is_expanded());
    }
}
