// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Shared vocabulary for the testtree projection: test identifiers, result
//! states, the diff-stream operation types, and the persisted expand/collapse
//! preference format.
//!
//! This crate owns everything that crosses the boundary between the
//! projection engine ([`testtree-projection`](https://crates.io/crates/testtree-projection))
//! and its collaborators: the diff-stream producer, the result lookup
//! service, and whatever persists UI state between sessions. All types here
//! serialize with serde.

mod diff;
mod errors;
mod saved_state;
mod state;
mod test_id;

pub use diff::*;
pub use errors::*;
pub use saved_state::*;
pub use state::*;
pub use test_id::*;
