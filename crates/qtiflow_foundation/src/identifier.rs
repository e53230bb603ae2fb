//! Identifiers and variable references.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A QTI identifier (variable, field, choice, or control-object name).
///
/// Cloning is O(1); the underlying string is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Identifier(Arc<str>);

impl Identifier {
    /// Creates an identifier from a string.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A reference to a variable, optionally qualified by an item reference.
///
/// Written `SCORE` for a local variable or `Q1.SCORE` for the variable
/// `SCORE` of the item referenced by `Q1` (test scopes only).
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableRef {
    /// The qualifying item reference, if any.
    pub item_ref: Option<Identifier>,
    /// The variable identifier.
    pub identifier: Identifier,
}

impl VariableRef {
    /// Creates an unqualified reference.
    pub fn local(identifier: impl Into<Identifier>) -> Self {
        Self {
            item_ref: None,
            identifier: identifier.into(),
        }
    }

    /// Creates a reference qualified by an item reference identifier.
    pub fn qualified(item_ref: impl Into<Identifier>, identifier: impl Into<Identifier>) -> Self {
        Self {
            item_ref: Some(item_ref.into()),
            identifier: identifier.into(),
        }
    }

    /// Parses `item.variable` or `variable`.
    ///
    /// Only the first `.` separates the item reference.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.split_once('.') {
            Some((item, var)) if !item.is_empty() && !var.is_empty() => {
                Self::qualified(item, var)
            }
            _ => Self::local(text),
        }
    }

    /// Returns true if this reference names an item-ref-qualified variable.
    #[must_use]
    pub const fn is_qualified(&self) -> bool {
        self.item_ref.is_some()
    }
}

impl From<&str> for VariableRef {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<Identifier> for VariableRef {
    fn from(identifier: Identifier) -> Self {
        Self::local(identifier)
    }
}

impl fmt::Debug for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.item_ref {
            Some(item) => write!(f, "{item}.{}", self.identifier),
            None => write!(f, "{}", self.identifier),
        }
    }
}
