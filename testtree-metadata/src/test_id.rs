// Copyright (c) The testtree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::InvalidTestId;
use smol_str::SmolStr;
use std::{fmt, str::FromStr};

/// The reserved separator between path segments in a serialized [`TestId`].
///
/// NUL sorts below every other character, so lexicographic comparison of
/// serialized ids is the same as sequence comparison of their segments.
pub const ID_SEPARATOR: char = '\0';

/// Hierarchical identifier for a test item.
///
/// A `TestId` is an ordered sequence of path segments: the controller id
/// first, followed by the ids of nested items. A child's path is exactly its
/// parent's path plus one trailing segment, and equal serialized forms imply
/// equal identity.
///
/// The serialized form joins segments with [`ID_SEPARATOR`]; `Display`,
/// `FromStr` and serde all use it, so ids round-trip losslessly.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestId(SmolStr);

impl TestId {
    /// Validates and creates an id from its serialized form.
    pub fn new(serialized: impl Into<SmolStr>) -> Result<Self, InvalidTestId> {
        let serialized = serialized.into();
        if serialized.is_empty() {
            return Err(InvalidTestId::Empty);
        }
        if serialized.split(ID_SEPARATOR).any(str::is_empty) {
            return Err(InvalidTestId::EmptySegment);
        }
        Ok(Self(serialized))
    }

    /// Creates a root id for a controller.
    pub fn root(controller_id: &str) -> Result<Self, InvalidTestId> {
        Self::from_segments([controller_id])
    }

    /// Creates an id from individual path segments, controller id first.
    pub fn from_segments<'a>(
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, InvalidTestId> {
        let mut buf = String::new();
        for segment in segments {
            if segment.is_empty() {
                return Err(InvalidTestId::EmptySegment);
            }
            if segment.contains(ID_SEPARATOR) {
                return Err(InvalidTestId::SeparatorInSegment);
            }
            if !buf.is_empty() {
                buf.push(ID_SEPARATOR);
            }
            buf.push_str(segment);
        }
        if buf.is_empty() {
            return Err(InvalidTestId::Empty);
        }
        Ok(Self(buf.into()))
    }

    /// Returns the serialized form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(ID_SEPARATOR)
    }

    /// Returns the controller id (the first segment).
    pub fn controller_id(&self) -> &str {
        self.segments()
            .next()
            .expect("a validated id has at least one segment")
    }

    /// Returns the last path segment.
    pub fn local_id(&self) -> &str {
        match self.0.rfind(ID_SEPARATOR) {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    /// Returns the number of path segments.
    pub fn level(&self) -> usize {
        self.0.as_bytes().iter().filter(|&&b| b == 0).count() + 1
    }

    /// Returns true if this id has a single segment (a controller root).
    pub fn is_root(&self) -> bool {
        !self.0.contains(ID_SEPARATOR)
    }

    /// Returns the parent id, or `None` for a root.
    pub fn parent(&self) -> Option<TestId> {
        self.0
            .rfind(ID_SEPARATOR)
            .map(|pos| Self(SmolStr::new(&self.0[..pos])))
    }

    /// Returns the controller root this id belongs to.
    pub fn controller_root(&self) -> TestId {
        Self(SmolStr::new(self.controller_id()))
    }

    /// Creates a child id by appending one segment.
    pub fn child(&self, segment: &str) -> Result<TestId, InvalidTestId> {
        if segment.is_empty() {
            return Err(InvalidTestId::EmptySegment);
        }
        if segment.contains(ID_SEPARATOR) {
            return Err(InvalidTestId::SeparatorInSegment);
        }
        let mut buf = String::with_capacity(self.0.len() + 1 + segment.len());
        buf.push_str(&self.0);
        buf.push(ID_SEPARATOR);
        buf.push_str(segment);
        Ok(Self(buf.into()))
    }

    /// Returns true if `other` is a strict descendant of this id.
    pub fn is_ancestor_of(&self, other: &TestId) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(self.0.as_str())
            && other.0.as_bytes()[self.0.len()] == 0
    }

    /// Walks from this id's parent up to the controller root.
    pub fn ancestors(&self) -> impl Iterator<Item = TestId> {
        let mut current = self.parent();
        std::iter::from_fn(move || {
            let next = current.take()?;
            current = next.parent();
            Some(next)
        })
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TestId {
    type Err = InvalidTestId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for TestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for TestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let serialized = SmolStr::deserialize(deserializer)?;
        TestId::new(serialized).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn id(segments: &[&str]) -> TestId {
        TestId::from_segments(segments.iter().copied()).unwrap()
    }

    #[test]
    fn test_segments_round_trip() {
        let out = id(&["ctrl", "suite", "case"]);
        assert_eq!(out.segments().collect::<Vec<_>>(), ["ctrl", "suite", "case"]);
        assert_eq!(out.controller_id(), "ctrl");
        assert_eq!(out.local_id(), "case");
        assert_eq!(out.level(), 3);
        assert!(!out.is_root());

        let parsed: TestId = out.as_str().parse().unwrap();
        assert_eq!(parsed, out);
        assert_eq!(parsed.to_string(), out.as_str());
    }

    #[test]
    fn test_parent_child() {
        let root = TestId::root("ctrl").unwrap();
        assert!(root.is_root());
        assert_eq!(root.parent(), None);
        assert_eq!(root.level(), 1);

        let child = root.child("suite").unwrap();
        let grandchild = child.child("case").unwrap();
        assert_eq!(grandchild.parent(), Some(child.clone()));
        assert_eq!(child.parent(), Some(root.clone()));
        assert_eq!(grandchild.controller_root(), root);

        assert!(root.is_ancestor_of(&child));
        assert!(root.is_ancestor_of(&grandchild));
        assert!(child.is_ancestor_of(&grandchild));
        assert!(!child.is_ancestor_of(&root));
        assert!(!child.is_ancestor_of(&child));
    }

    #[test]
    fn test_ancestors_walk() {
        let leaf = id(&["ctrl", "a", "b", "c"]);
        let chain: Vec<_> = leaf.ancestors().collect();
        assert_eq!(
            chain,
            vec![id(&["ctrl", "a", "b"]), id(&["ctrl", "a"]), id(&["ctrl"])]
        );
    }

    #[test]
    fn test_ordering_matches_segment_sequence() {
        // "a" < ["a", "b"] < "ab": NUL sorts below 'b', so the two-segment id
        // stays between the plain prefixes.
        let a = id(&["a"]);
        let a_b = id(&["a", "b"]);
        let ab = id(&["ab"]);
        assert!(a < a_b);
        assert!(a_b < ab);

        // Sibling order is plain lexicographic on the differing segment.
        assert!(id(&["ctrl", "x"]) < id(&["ctrl", "y"]));
    }

    #[test]
    fn test_is_ancestor_rejects_sibling_prefix() {
        // "ctrl\0ab" must not look like a descendant of "ctrl\0a".
        let short = id(&["ctrl", "a"]);
        let sibling = id(&["ctrl", "ab"]);
        let child = id(&["ctrl", "a", "b"]);
        assert!(!short.is_ancestor_of(&sibling));
        assert!(short.is_ancestor_of(&child));
    }

    #[test_case(""; "empty string")]
    #[test_case("\0"; "lone separator")]
    #[test_case("ctrl\0"; "trailing separator")]
    #[test_case("\0case"; "leading separator")]
    #[test_case("ctrl\0\0case"; "double separator")]
    fn test_invalid_serialized(input: &str) {
        assert!(TestId::new(input).is_err());
        let json = serde_json::to_string(input).unwrap();
        assert!(serde_json::from_str::<TestId>(&json).is_err());
    }

    #[test]
    fn test_invalid_segments() {
        assert_eq!(
            TestId::from_segments(std::iter::empty()),
            Err(InvalidTestId::Empty)
        );
        assert_eq!(
            TestId::from_segments(["ctrl", ""]),
            Err(InvalidTestId::EmptySegment)
        );
        assert_eq!(
            TestId::from_segments(["ctrl", "a\0b"]),
            Err(InvalidTestId::SeparatorInSegment)
        );
        assert_eq!(
            TestId::root("ctrl").unwrap().child("a\0b"),
            Err(InvalidTestId::SeparatorInSegment)
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let original = id(&["ctrl", "suite", "case"]);
        let json = serde_json::to_string(&original).unwrap();
        let parsed: TestId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
