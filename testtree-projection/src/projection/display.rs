// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    helpers::{plural, state_code, INDENT},
    projection::{store::TestNode, TestTreeProjection},
};
use itertools::Itertools;
use owo_colors::{OwoColorize, Style};
use serde::{Deserialize, Serialize};
use std::{fmt, io};
use testtree_metadata::{ExpandState, TestId, TestResultState};

/// A serialized, machine-readable output format.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SerializableFormat {
    /// JSON with no whitespace.
    Json,
    /// JSON, prettified.
    JsonPretty,
}

impl SerializableFormat {
    /// Write this data in the given format to the writer.
    pub fn to_writer(
        self,
        value: &impl Serialize,
        writer: impl io::Write,
    ) -> serde_json::Result<()> {
        match self {
            SerializableFormat::Json => serde_json::to_writer(writer, value),
            SerializableFormat::JsonPretty => serde_json::to_writer_pretty(writer, value),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Styles {
    group: Style,
    test_name: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    in_flight: Style,
    unset: Style,
    error_text: Style,
}

impl Styles {
    pub(crate) fn colorize(&mut self) {
        self.group = Style::new().magenta().bold();
        self.test_name = Style::new().blue().bold();
        self.pass = Style::new().green();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow();
        self.in_flight = Style::new().cyan();
        self.error_text = Style::new().red();
    }

    fn for_state(&self, state: TestResultState) -> &Style {
        match state {
            TestResultState::Passed => &self.pass,
            TestResultState::Failed | TestResultState::Errored => &self.fail,
            TestResultState::Skipped => &self.skip,
            TestResultState::Running | TestResultState::Queued => &self.in_flight,
            TestResultState::Unset => &self.unset,
        }
    }
}

/// Human-readable rendering of the currently visible tree: roots always,
/// children only under expanded nodes, the synthetic error leaf first.
pub struct TreeDisplay<'a> {
    projection: &'a TestTreeProjection,
    styles: Styles,
}

impl<'a> TreeDisplay<'a> {
    /// Switches on ANSI colors.
    pub fn colorized(mut self) -> Self {
        self.styles.colorize();
        self
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, node: &TestNode, depth: usize) -> fmt::Result {
        let code = format!("{:>6}", state_code(node.computed_state()));
        write!(f, "{} ", code.style(*self.styles.for_state(node.computed_state())))?;
        for _ in 0..depth {
            f.write_str(INDENT)?;
        }
        let label_style = if node.is_leaf() {
            &self.styles.test_name
        } else {
            &self.styles.group
        };
        writeln!(f, "{}", node.label().style(*label_style))?;

        if !node.expand().is_expanded() {
            return Ok(());
        }
        if let Some(error) = node.error() {
            let bang = format!("{:>6}", "!");
            write!(f, "{} ", bang.style(self.styles.error_text))?;
            for _ in 0..=depth {
                f.write_str(INDENT)?;
            }
            writeln!(f, "{}", error.style(self.styles.error_text))?;
        }
        for child_id in node.children() {
            if let Some(child) = self.projection.store().get(child_id) {
                self.write_node(f, child, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.projection.store();
        for root_id in store.roots() {
            if let Some(root) = store.get(root_id) {
                self.write_node(f, root, 0)?;
            }
        }
        Ok(())
    }
}

/// Leaf counts by computed state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TreeCounts {
    /// Number of leaves.
    pub total: usize,
    /// Leaves whose computed state is passed.
    pub passed: usize,
    /// Leaves whose computed state is failed.
    pub failed: usize,
    /// Leaves whose computed state is errored.
    pub errored: usize,
    /// Leaves whose computed state is running.
    pub running: usize,
    /// Leaves whose computed state is queued.
    pub queued: usize,
    /// Leaves whose computed state is skipped.
    pub skipped: usize,
    /// Leaves with no result.
    pub unset: usize,
}

impl fmt::Display for TreeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            (self.passed, "passed"),
            (self.failed, "failed"),
            (self.errored, "errored"),
            (self.running, "running"),
            (self.queued, "queued"),
            (self.skipped, "skipped"),
            (self.unset, "unset"),
        ];
        let breakdown = parts
            .iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, name)| format!("{count} {name}"))
            .join(", ");
        write!(f, "{} {}", self.total, plural::items_str(self.total))?;
        if !breakdown.is_empty() {
            write!(f, ": {breakdown}")?;
        }
        Ok(())
    }
}

/// Serializable snapshot of one visible node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    /// The node's identity.
    pub id: TestId,
    /// Display label.
    pub label: String,
    /// Computed result state.
    pub state: TestResultState,
    /// Expand tri-state.
    pub expand: ExpandState,
    /// Error text, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Visible children; empty while the node is collapsed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSummary>,
}

/// Serializable snapshot of the visible tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    /// Root nodes in display order.
    pub roots: Vec<NodeSummary>,
}

impl TestTreeProjection {
    /// Human-readable view of the visible tree.
    pub fn display(&self) -> TreeDisplay<'_> {
        TreeDisplay {
            projection: self,
            styles: Styles::default(),
        }
    }

    /// Leaf counts by computed state.
    pub fn counts(&self) -> TreeCounts {
        let mut counts = TreeCounts::default();
        for node in self.store().iter().filter(|node| node.is_leaf()) {
            counts.total += 1;
            match node.computed_state() {
                TestResultState::Passed => counts.passed += 1,
                TestResultState::Failed => counts.failed += 1,
                TestResultState::Errored => counts.errored += 1,
                TestResultState::Running => counts.running += 1,
                TestResultState::Queued => counts.queued += 1,
                TestResultState::Skipped => counts.skipped += 1,
                TestResultState::Unset => counts.unset += 1,
            }
        }
        counts
    }

    /// Serializable snapshot of the visible tree, for
    /// [`SerializableFormat::to_writer`].
    pub fn visible_summary(&self) -> TreeSummary {
        let store = self.store();
        TreeSummary {
            roots: store
                .roots()
                .iter()
                .filter_map(|id| store.get(id))
                .map(|node| self.node_summary(node))
                .collect(),
        }
    }

    fn node_summary(&self, node: &TestNode) -> NodeSummary {
        let children = if node.expand().is_expanded() {
            node.children()
                .iter()
                .filter_map(|id| self.store().get(id))
                .map(|child| self.node_summary(child))
                .collect()
        } else {
            Vec::new()
        };
        NodeSummary {
            id: node.id().clone(),
            label: node.label().to_owned(),
            state: node.computed_state(),
            expand: node.expand(),
            error: node.summary().error.clone(),
            children,
        }
    }
}
