//! Traversal paths.
//!
//! A [`CodingPath`] names the position the engine is currently encoding: a sequence of
//! keyed-container keys and unkeyed-container indices starting at the root. It grows by
//! one segment for every child being boxed and shrinks again once the child is done.

use std::fmt;

/// The key used for superclass encoding scopes in keyed containers.
pub const SUPER_KEY: &str = "super";

/// A single step in a [`CodingPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A keyed-container key, as written by the traversed type (before key conversion).
    Key(String),
    /// A position in an unkeyed container.
    Index(usize),
}

impl PathSegment {
    /// Convenience constructor for [`PathSegment::Key`].
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Returns the key, if this is a keyed segment.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(k) => Some(k),
            Self::Index(_) => None,
        }
    }

    /// Returns the index, if this is an unkeyed segment.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Key(_) => None,
            Self::Index(i) => Some(*i),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => write!(f, ".{k}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// An ordered sequence of [`PathSegment`]s from the root to the current position.
///
/// Displayed as `$` for the root, e.g. `$.users[3].name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CodingPath {
    segments: Vec<PathSegment>,
}

impl CodingPath {
    /// The empty (root) path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a path from the provided segments.
    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Returns the stored segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments (the traversal depth).
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true for the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the innermost segment.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Returns a copy of this path extended by `segment`.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub(crate) fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }
}

impl fmt::Display for CodingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
