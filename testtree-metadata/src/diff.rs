// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{state::ExpandState, test_id::TestId};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A half-open source location attached to a test item.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRange {
    /// Zero-based start line.
    pub start_line: u32,
    /// Zero-based start column.
    pub start_column: u32,
    /// Zero-based end line.
    pub end_line: u32,
    /// Zero-based end column, exclusive.
    pub end_column: u32,
}

/// Display attributes of a test item. All fields are mutable via
/// [`TestItemPatch`] updates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestItemSummary {
    /// Human-readable label.
    pub label: String,

    /// Overrides the label for sibling ordering, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_text: Option<String>,

    /// Diagnostic text surfaced as a synthetic child in the rendered tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Source file the item was discovered in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<Utf8PathBuf>,

    /// Location within `uri`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,

    /// Provider-defined tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<SmolStr>,
}

impl TestItemSummary {
    /// Creates a summary with just a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// A test item as announced by an Add operation: its identity plus display
/// attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestItemDescription {
    /// Hierarchical identity of the item.
    pub id: TestId,

    /// Display attributes.
    #[serde(flatten)]
    pub summary: TestItemSummary,
}

/// A partial update to a test item's display attributes.
///
/// For the clearable fields the encoding is a double option: an absent field
/// leaves the attribute unchanged, JSON `null` clears it, and a value
/// replaces it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestItemPatch {
    /// New label, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// New sort text; inner `None` clears it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub sort_text: Option<Option<String>>,

    /// New error text; inner `None` clears it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub error: Option<Option<String>>,

    /// New source file; inner `None` clears it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub uri: Option<Option<Utf8PathBuf>>,

    /// New source range; inner `None` clears it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub range: Option<Option<SourceRange>>,
}

impl TestItemPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.sort_text.is_none()
            && self.error.is_none()
            && self.uri.is_none()
            && self.range.is_none()
    }

    /// Returns true if applying the patch can change sibling ordering.
    pub fn touches_sort_key(&self) -> bool {
        self.label.is_some() || self.sort_text.is_some()
    }

    /// Applies the patch to a summary in place.
    pub fn apply_to(&self, summary: &mut TestItemSummary) {
        if let Some(label) = &self.label {
            summary.label = label.clone();
        }
        if let Some(sort_text) = &self.sort_text {
            summary.sort_text = sort_text.clone();
        }
        if let Some(error) = &self.error {
            summary.error = error.clone();
        }
        if let Some(uri) = &self.uri {
            summary.uri = uri.clone();
        }
        if let Some(range) = &self.range {
            summary.range = *range;
        }
    }
}

/// One operation in the membership diff stream.
///
/// Batches may interleave operations in arbitrary order; consumers apply all
/// Adds, then all Updates, then all Removes, since later operations may
/// target ids introduced earlier in the same batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TestDiffOp {
    /// A new item appeared. The parent (if any) is announced before its
    /// children within a stream.
    Add {
        /// Controller that owns the item; mirrors the first path segment of
        /// `item.id`.
        controller_id: SmolStr,

        /// Initial expand state reported by the provider.
        expand: ExpandState,

        /// The item itself.
        item: TestItemDescription,
    },

    /// Display attributes of an existing item changed.
    Update {
        /// The item being updated.
        ext_id: TestId,

        /// The partial update.
        patch: TestItemPatch,
    },

    /// An item (and implicitly its whole subtree) disappeared.
    Remove {
        /// The item being removed.
        ext_id: TestId,
    },
}

/// An ordered batch of diff operations, applied atomically with respect to
/// observers.
pub type TestDiffBatch = Vec<TestDiffOp>;

/// Serde adapter distinguishing an absent field from an explicit `null`.
///
/// Deserializing a present field always produces `Some(inner)`; combined with
/// `#[serde(default)]`, absence produces `None`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(segments: &[&str]) -> TestId {
        TestId::from_segments(segments.iter().copied()).unwrap()
    }

    #[test]
    fn test_add_serialization() {
        let op = TestDiffOp::Add {
            controller_id: "ctrl".into(),
            expand: ExpandState::Expandable,
            item: TestItemDescription {
                id: id(&["ctrl", "a"]),
                summary: TestItemSummary {
                    sort_text: Some("0001".to_owned()),
                    ..TestItemSummary::new("a")
                },
            },
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "add");
        assert_eq!(json["controllerId"], "ctrl");
        assert_eq!(json["expand"], "expandable");
        assert_eq!(json["item"]["label"], "a");
        assert_eq!(json["item"]["sortText"], "0001");
        // Absent optionals are omitted entirely.
        assert!(json["item"].get("error").is_none());

        let parsed: TestDiffOp = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, op);
    }

    #[test]
    fn test_patch_double_option() {
        // Absent field: unchanged. Null: cleared. Value: replaced.
        let patch: TestItemPatch =
            serde_json::from_str(r#"{"label": "renamed", "error": null}"#).unwrap();
        assert_eq!(patch.label.as_deref(), Some("renamed"));
        assert_eq!(patch.error, Some(None));
        assert_eq!(patch.sort_text, None);

        let patch: TestItemPatch = serde_json::from_str(r#"{"sortText": "zz"}"#).unwrap();
        assert_eq!(patch.sort_text, Some(Some("zz".to_owned())));
        assert!(patch.touches_sort_key());

        let patch: TestItemPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
        assert!(!patch.touches_sort_key());
    }

    #[test]
    fn test_patch_apply() {
        let mut summary = TestItemSummary {
            sort_text: Some("0001".to_owned()),
            error: Some("compile error".to_owned()),
            ..TestItemSummary::new("old")
        };
        let patch = TestItemPatch {
            label: Some("new".to_owned()),
            error: Some(None),
            ..TestItemPatch::default()
        };
        patch.apply_to(&mut summary);
        assert_eq!(summary.label, "new");
        assert_eq!(summary.error, None);
        // Untouched fields survive.
        assert_eq!(summary.sort_text.as_deref(), Some("0001"));
    }

    #[test]
    fn test_remove_serialization() {
        let op = TestDiffOp::Remove {
            ext_id: id(&["ctrl", "a"]),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "remove");
        assert_eq!(json["extId"], "ctrl\0a");
        let parsed: TestDiffOp = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, op);
    }
}
