//! Paths identifying nodes by their ancestry.

use std::fmt;

/// Location of a node, written as `/`-separated segments such as
/// `assessmentTest[T]/testPart[P1]/branchRule[S2]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// Creates a path with one segment.
    #[must_use]
    pub fn root(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// Creates a path with one `name[identifier]` segment.
    #[must_use]
    pub fn root_named(name: &str, identifier: impl fmt::Display) -> Self {
        Self::root(format!("{name}[{identifier}]"))
    }

    /// Returns this path extended by `segment`.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Returns this path extended by a `name[identifier]` segment.
    #[must_use]
    pub fn child_named(&self, name: &str, identifier: impl fmt::Display) -> Self {
        self.child(format!("{name}[{identifier}]"))
    }

    /// Returns this path with `other` appended.
    #[must_use]
    pub fn join(&self, other: &NodePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the last segment.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
