#![forbid(unsafe_code)]

//! Dotted field paths.
//!
//! A [`FieldPath`] names a location inside a [`Value`](crate::Value) tree:
//! `"email"`, `"profile.address.city"`, `"tags.1"`. Segments are plain
//! strings; a segment is interpreted as an index only when the container it
//! is applied to is an array.

use std::fmt;
use std::str::FromStr;

/// Errors raised while parsing or applying a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path has no segments.
    #[error("field path is empty")]
    Empty,
    /// The path contains an empty segment (`"a..b"`, `".a"`).
    #[error("field path '{0}' contains an empty segment")]
    EmptySegment(String),
    /// A segment was applied to a value that cannot hold children.
    #[error("cannot address '{segment}' inside a {found} value")]
    NotAContainer {
        segment: String,
        found: &'static str,
    },
    /// A segment applied to an array is not a valid index.
    #[error("'{0}' is not a valid array index")]
    InvalidIndex(String),
    /// An array index is past the end (only `len` itself may append).
    #[error("index {index} is out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A parsed, non-empty sequence of path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = raw.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(raw.to_owned()));
        }
        Ok(Self { segments })
    }

    /// A single-segment path naming a top-level key verbatim.
    ///
    /// Unlike [`parse`](Self::parse), dots in `key` are not treated as
    /// separators.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            segments: vec![key.into()],
        }
    }

    /// Build a path from pre-split segments.
    pub fn from_segments<I, T>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(segments.join(".")));
        }
        Ok(Self { segments })
    }

    /// Append a segment, returning the extended path.
    #[must_use]
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// The path segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; a `FieldPath` cannot be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first segment.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// The last segment.
    #[must_use]
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Split into the parent segments and the leaf.
    #[must_use]
    pub fn split_leaf(&self) -> (&[String], &str) {
        let (leaf, parents) = self
            .segments
            .split_last()
            .map(|(leaf, rest)| (leaf.as_str(), rest))
            .unwrap_or(("", &[]));
        (parents, leaf)
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Interpret `segment` as an array index.
pub(crate) fn parse_index(segment: &str) -> Result<usize, PathError> {
    // Reject "+1" and " 1" which usize::from_str would partly accept.
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PathError::InvalidIndex(segment.to_owned()));
    }
    segment
        .parse()
        .map_err(|_| PathError::InvalidIndex(segment.to_owned()))
}
