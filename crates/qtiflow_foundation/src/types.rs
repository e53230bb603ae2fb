//! Base types, cardinalities, and the signature algebra.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The scalar type of a value's element(s).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum BaseType {
    /// Identifier (choice names and the like).
    Identifier,
    /// Boolean.
    Boolean,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Float,
    /// String.
    String,
    /// Point with integer coordinates.
    Point,
    /// Unordered pair of identifiers.
    Pair,
    /// Ordered pair of identifiers.
    DirectedPair,
    /// Duration in seconds.
    Duration,
    /// URI.
    Uri,
}

impl BaseType {
    /// All base types, in declaration order.
    pub const ALL: [BaseType; 10] = [
        Self::Identifier,
        Self::Boolean,
        Self::Integer,
        Self::Float,
        Self::String,
        Self::Point,
        Self::Pair,
        Self::DirectedPair,
        Self::Duration,
        Self::Uri,
    ];

    /// Numeric base types accepted by arithmetic and comparison operators.
    pub const NUMERIC: [BaseType; 2] = [Self::Integer, Self::Float];

    /// Returns true for integer and float.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Checks whether a value of `actual` base type may populate a slot
    /// requiring `self`.
    ///
    /// The single implicit conversion is duration to float.
    #[must_use]
    pub fn accepts(self, actual: BaseType) -> bool {
        self == actual || (self == Self::Float && actual == Self::Duration)
    }

    /// Returns the QTI name of this base type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Point => "point",
            Self::Pair => "pair",
            Self::DirectedPair => "directedPair",
            Self::Duration => "duration",
            Self::Uri => "uri",
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The container shape of a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Cardinality {
    /// Exactly one value.
    Single,
    /// Unordered bag of values.
    Multiple,
    /// Sequence of values.
    Ordered,
    /// Field-keyed mapping of single values.
    Record,
}

impl Cardinality {
    /// Returns true for multiple and ordered.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Multiple | Self::Ordered)
    }

    /// Returns the QTI name of this cardinality.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multiple => "multiple",
            Self::Ordered => "ordered",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A (cardinality, base type) pair, or the record signature.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Signature {
    /// A single value of the given base type.
    Single(BaseType),
    /// A multiple container of the given base type.
    Multiple(BaseType),
    /// An ordered container of the given base type.
    Ordered(BaseType),
    /// A record.
    Record,
}

impl Signature {
    /// Builds a signature from its parts.
    ///
    /// Returns `None` for a non-record cardinality without a base type.
    #[must_use]
    pub const fn new(cardinality: Cardinality, base_type: Option<BaseType>) -> Option<Self> {
        match (cardinality, base_type) {
            (Cardinality::Record, _) => Some(Self::Record),
            (Cardinality::Single, Some(bt)) => Some(Self::Single(bt)),
            (Cardinality::Multiple, Some(bt)) => Some(Self::Multiple(bt)),
            (Cardinality::Ordered, Some(bt)) => Some(Self::Ordered(bt)),
            _ => None,
        }
    }

    /// Returns the cardinality.
    #[must_use]
    pub const fn cardinality(self) -> Cardinality {
        match self {
            Self::Single(_) => Cardinality::Single,
            Self::Multiple(_) => Cardinality::Multiple,
            Self::Ordered(_) => Cardinality::Ordered,
            Self::Record => Cardinality::Record,
        }
    }

    /// Returns the base type, or `None` for records.
    #[must_use]
    pub const fn base_type(self) -> Option<BaseType> {
        match self {
            Self::Single(bt) | Self::Multiple(bt) | Self::Ordered(bt) => Some(bt),
            Self::Record => None,
        }
    }

    /// Returns this signature with its cardinality replaced.
    ///
    /// Records have no base type, so converting to a record drops it and
    /// converting a record to anything else yields `None`.
    #[must_use]
    pub const fn with_cardinality(self, cardinality: Cardinality) -> Option<Self> {
        Self::new(cardinality, self.base_type())
    }

    /// Checks whether a value with signature `actual` may legally populate a
    /// slot declared with signature `required`.
    ///
    /// Cardinalities must be equal; base types must satisfy
    /// [`BaseType::accepts`].
    #[must_use]
    pub fn matches(required: Signature, actual: Signature) -> bool {
        match (required, actual) {
            (Self::Record, Self::Record) => true,
            (Self::Single(r), Self::Single(a))
            | (Self::Multiple(r), Self::Multiple(a))
            | (Self::Ordered(r), Self::Ordered(a)) => r.accepts(a),
            _ => false,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base_type() {
            Some(bt) => write!(f, "{} {bt}", self.cardinality()),
            None => write!(f, "record"),
        }
    }
}
