// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use testtree_metadata::TestResultState;

/// Pluralization helpers for displayed output.
pub(crate) mod plural {
    /// Returns "item" if `count` is 1, otherwise "items".
    pub(crate) fn items_str(count: usize) -> &'static str {
        if count == 1 { "item" } else { "items" }
    }
}

/// Short status code shown in front of a displayed tree row.
pub(crate) fn state_code(state: TestResultState) -> &'static str {
    match state {
        TestResultState::Unset => "-",
        TestResultState::Queued => "QUEUED",
        TestResultState::Running => "RUN",
        TestResultState::Passed => "PASS",
        TestResultState::Failed => "FAIL",
        TestResultState::Errored => "ERROR",
        TestResultState::Skipped => "SKIP",
    }
}

/// One level of indentation in displayed output.
pub(crate) const INDENT: &str = "    ";
