//! Tree path value objects
//!
//! A [`TreePath`] addresses one location inside a state tree using the
//! dot/bracket convention, e.g. `chat.sessions.[2].title`. Paths are
//! immutable value objects: parsed once, compared structurally, and
//! rendered back to a canonical string form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a tree path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object property access by name
    Key(String),
    /// Array element access by index
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(idx) => write!(f, "[{idx}]"),
        }
    }
}

/// Parsed dot/bracket path into a state tree
///
/// Both `a.b.[2].c` and `a.b[2].c` parse to the same path. The
/// canonical rendering always separates index segments with dots
/// (`a.b.[2].c`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TreePath {
    segments: Vec<PathSegment>,
}

impl TreePath {
    /// The empty path, addressing the tree root
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path from its string form
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        for part in raw.split('.').filter(|p| !p.is_empty()) {
            // A part may carry trailing bracket indices: `sessions[2]`
            let (head, rest) = match part.find('[') {
                Some(0) => ("", part),
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };
            if !head.is_empty() {
                segments.push(PathSegment::Key(head.to_string()));
            }
            let mut remainder = rest;
            while let Some(close) = remainder.find(']') {
                let inner = &remainder[1..close];
                match inner.parse::<usize>() {
                    Ok(idx) => segments.push(PathSegment::Index(idx)),
                    // Malformed index degrades to a literal key segment
                    Err(_) => segments.push(PathSegment::Key(remainder[..=close].to_string())),
                }
                remainder = &remainder[close + 1..];
            }
        }
        Self { segments }
    }

    /// Build a path from segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Segments of this path, root first
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root path
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parent path, or `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Extend this path by one segment
    pub fn join(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Extend this path by a key segment
    pub fn join_key<K: Into<String>>(&self, key: K) -> Self {
        self.join(PathSegment::Key(key.into()))
    }

    /// Extend this path by an index segment
    pub fn join_index(&self, index: usize) -> Self {
        self.join(PathSegment::Index(index))
    }

    /// Whether `prefix` is a (non-strict) prefix of this path
    pub fn starts_with(&self, prefix: &Self) -> bool {
        prefix.segments.len() <= self.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Whether `prefix` is a strict prefix of this path
    pub fn is_strict_prefix(&self, prefix: &Self) -> bool {
        prefix.segments.len() < self.segments.len() && self.starts_with(prefix)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for TreePath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl TryFrom<String> for TreePath {
    type Error = std::convert::Infallible;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        Ok(Self::parse(&raw))
    }
}

impl From<TreePath> for String {
    fn from(path: TreePath) -> Self {
        path.to_string()
    }
}
