// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testtree-metadata.

use crate::state::TestResultState;
use thiserror::Error;

/// An error that occurred while validating a [`TestId`](crate::TestId).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidTestId {
    /// The serialized form or segment list was empty.
    #[error("test id is empty")]
    Empty,

    /// A path segment was empty.
    #[error("test id contains an empty path segment")]
    EmptySegment,

    /// A path segment contained the reserved separator character.
    #[error("path segment contains the reserved NUL separator")]
    SeparatorInSegment,
}

/// Error returned while parsing a [`TestResultState`] value from a string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(
    "unrecognized test result state: {input}\n(known values: {})",
    TestResultState::variants().join(", "),
)]
pub struct TestResultStateParseError {
    input: String,
}

impl TestResultStateParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while decoding persisted tree state.
#[derive(Debug, Error)]
#[error("failed to parse saved tree state")]
pub struct SavedTreeStateError {
    #[source]
    err: serde_json::Error,
}

impl SavedTreeStateError {
    pub(crate) fn new(err: serde_json::Error) -> Self {
        Self { err }
    }
}
