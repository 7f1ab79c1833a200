// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Incremental hierarchical tree projection over a test-diff stream.
//!
//! The projection maintains a live tree of test items from a stream of
//! Add/Update/Remove diffs plus a separate channel of result-state change
//! notifications, and mirrors it into an externally supplied tree control.
//! It keeps siblings sorted, rolls result states up through ancestors, and
//! synthesizes a leaf child for an item's error text.
//!
//! The core is single-threaded and synchronous: each diff batch or state
//! notification is applied to completion, and the tree control is invoked
//! once per flush. See [`projection::TestTreeProjection`] for the entry
//! point and [`projection::TreeControl`] for the rendering seam.

pub mod events;
mod helpers;
pub mod projection;
