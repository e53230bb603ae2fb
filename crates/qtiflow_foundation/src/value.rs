//! Core value type for all session variables.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::{Error, ErrorKind};
use crate::identifier::Identifier;
use crate::types::{BaseType, Cardinality, Signature};

// =============================================================================
// Single Values
// =============================================================================

/// One scalar of a base type.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SingleValue {
    /// Identifier value.
    Identifier(Identifier),
    /// Boolean value.
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// String value.
    String(Arc<str>),
    /// Point with integer coordinates.
    Point(i64, i64),
    /// Unordered pair of identifiers.
    Pair(Identifier, Identifier),
    /// Ordered pair of identifiers.
    DirectedPair(Identifier, Identifier),
    /// Duration in seconds.
    Duration(f64),
    /// URI.
    Uri(Arc<str>),
}

/// A numeric operand, after the duration-to-float conversion.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Number {
    /// Integer operand.
    Integer(i64),
    /// Float operand.
    Float(f64),
}

impl Number {
    /// Returns the value as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(n) => n as f64,
            Self::Float(n) => n,
        }
    }

    /// Returns the integral value, if this number has one.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_integral(self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(n),
            Self::Float(n) if n.fract() == 0.0 && n.is_finite() => Some(n as i64),
            Self::Float(_) => None,
        }
    }
}

impl SingleValue {
    /// Returns the base type of this value.
    #[must_use]
    pub const fn base_type(&self) -> BaseType {
        match self {
            Self::Identifier(_) => BaseType::Identifier,
            Self::Boolean(_) => BaseType::Boolean,
            Self::Integer(_) => BaseType::Integer,
            Self::Float(_) => BaseType::Float,
            Self::String(_) => BaseType::String,
            Self::Point(..) => BaseType::Point,
            Self::Pair(..) => BaseType::Pair,
            Self::DirectedPair(..) => BaseType::DirectedPair,
            Self::Duration(_) => BaseType::Duration,
            Self::Uri(_) => BaseType::Uri,
        }
    }

    /// Creates an identifier value.
    pub fn identifier(id: impl Into<Identifier>) -> Self {
        Self::Identifier(id.into())
    }

    /// Creates a string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::String(s.into())
    }

    /// Creates an unordered pair.
    pub fn pair(a: impl Into<Identifier>, b: impl Into<Identifier>) -> Self {
        Self::Pair(a.into(), b.into())
    }

    /// Creates a directed pair.
    pub fn directed_pair(a: impl Into<Identifier>, b: impl Into<Identifier>) -> Self {
        Self::DirectedPair(a.into(), b.into())
    }

    /// Extracts a numeric operand.
    ///
    /// Durations are treated as floats (seconds); this is the one built-in
    /// implicit conversion.
    #[must_use]
    pub const fn as_number(&self) -> Option<Number> {
        match self {
            Self::Integer(n) => Some(Number::Integer(*n)),
            Self::Float(n) | Self::Duration(n) => Some(Number::Float(*n)),
            _ => None,
        }
    }

    /// Attempts to extract a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an identifier.
    #[must_use]
    pub const fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Self::Identifier(id) => Some(id),
            _ => None,
        }
    }

    /// Converts this value so that it may populate a slot of `target`
    /// base type. Only duration to float is converted.
    fn coerce_to(&self, target: BaseType) -> Option<SingleValue> {
        match (self, target) {
            (Self::Duration(secs), BaseType::Float) => Some(Self::Float(*secs)),
            (v, t) if v.base_type() == t => Some(v.clone()),
            _ => None,
        }
    }
}

// Floats compare by bits so that equality is reflexive; pairs are unordered.
impl PartialEq for SingleValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Identifier(a), Self::Identifier(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) | (Self::Duration(a), Self::Duration(b)) => {
                a.to_bits() == b.to_bits()
            }
            (Self::String(a), Self::String(b)) | (Self::Uri(a), Self::Uri(b)) => a == b,
            (Self::Point(ax, ay), Self::Point(bx, by)) => ax == bx && ay == by,
            (Self::Pair(a1, a2), Self::Pair(b1, b2)) => {
                (a1 == b1 && a2 == b2) || (a1 == b2 && a2 == b1)
            }
            (Self::DirectedPair(a1, a2), Self::DirectedPair(b1, b2)) => a1 == b1 && a2 == b2,
            _ => false,
        }
    }
}

impl Eq for SingleValue {}

impl fmt::Debug for SingleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            other => fmt::Display::fmt(other, f),
        }
    }
}

impl fmt::Display for SingleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(id) => write!(f, "{id}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) | Self::Uri(s) => write!(f, "{s}"),
            Self::Point(x, y) => write!(f, "{x} {y}"),
            Self::Pair(a, b) | Self::DirectedPair(a, b) => write!(f, "{a} {b}"),
            Self::Duration(secs) => write!(f, "{secs}s"),
        }
    }
}

impl From<bool> for SingleValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for SingleValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for SingleValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for SingleValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for SingleValue {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<Identifier> for SingleValue {
    fn from(id: Identifier) -> Self {
        Self::Identifier(id)
    }
}

// =============================================================================
// Containers
// =============================================================================

/// Non-empty persistent sequence of single values sharing one base type.
///
/// Used for both multiple and ordered values; the enclosing [`Value`]
/// variant decides whether order is significant.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Container {
    base_type: BaseType,
    values: im::Vector<SingleValue>,
}

impl Container {
    /// Builds a container from single values.
    ///
    /// Returns `Ok(None)` for an empty input.
    ///
    /// # Errors
    /// Returns an error if the values do not share one base type.
    pub fn from_singles(values: impl IntoIterator<Item = SingleValue>) -> Result<Option<Self>> {
        let values: im::Vector<SingleValue> = values.into_iter().collect();
        let Some(first) = values.front() else {
            return Ok(None);
        };
        let base_type = first.base_type();
        if let Some(bad) = values.iter().find(|v| v.base_type() != base_type) {
            return Err(Error::new(ErrorKind::MixedBaseTypes {
                expected: base_type,
                actual: bad.base_type(),
            }));
        }
        Ok(Some(Self { base_type, values }))
    }

    /// Returns the shared base type.
    #[must_use]
    pub const fn base_type(&self) -> BaseType {
        self.base_type
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; empty containers are represented as NULL.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> impl Iterator<Item = &SingleValue> {
        self.values.iter()
    }

    /// Gets an element by zero-based position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SingleValue> {
        self.values.get(index)
    }

    /// Returns true if any element equals `value`.
    #[must_use]
    pub fn contains(&self, value: &SingleValue) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Multiset equality: same elements with the same multiplicities.
    #[must_use]
    pub fn bag_eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut used = vec![false; other.len()];
        self.values.iter().all(|a| {
            let slot = other
                .values
                .iter()
                .enumerate()
                .position(|(i, b)| !used[i] && a == b);
            match slot {
                Some(i) => {
                    used[i] = true;
                    true
                }
                None => false,
            }
        })
    }

    /// Sequence equality.
    #[must_use]
    pub fn seq_eq(&self, other: &Self) -> bool {
        self.values == other.values
    }

    fn map_singles(&self, f: impl Fn(&SingleValue) -> Option<SingleValue>) -> Option<Self> {
        let values = self.values.iter().map(f).collect::<Option<im::Vector<_>>>()?;
        let base_type = values.front()?.base_type();
        Some(Self { base_type, values })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

/// Persistent mapping from field identifier to single value.
#[derive(Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record(im::OrdMap<Identifier, SingleValue>);

impl Record {
    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, field: &Identifier) -> Option<&SingleValue> {
        self.0.get(field)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over fields in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &SingleValue)> {
        self.0.iter()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

// =============================================================================
// Values
// =============================================================================

/// A session variable value.
///
/// Values are immutable and cheaply cloneable. Assigning a variable replaces
/// its value; stored values are never mutated in place.
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// The NULL value.
    #[default]
    Null,
    /// A single value.
    Single(SingleValue),
    /// An unordered bag of single values.
    Multiple(Container),
    /// A sequence of single values.
    Ordered(Container),
    /// A record of named single values.
    Record(Record),
}

impl Value {
    /// Builds a value of the given cardinality from single values.
    ///
    /// An empty list yields NULL.
    ///
    /// # Errors
    /// Returns an error if a single value receives more than one element,
    /// the elements have mixed base types, or the cardinality is record
    /// (use [`Value::from_fields`]).
    pub fn from_singles(cardinality: Cardinality, singles: Vec<SingleValue>) -> Result<Self> {
        match cardinality {
            Cardinality::Single => {
                let mut iter = singles.into_iter();
                match (iter.next(), iter.next()) {
                    (None, _) => Ok(Self::Null),
                    (Some(v), None) => Ok(Self::Single(v)),
                    (Some(_), Some(_)) => Err(Error::new(ErrorKind::InvalidContainer(
                        "single cardinality takes at most one value".to_string(),
                    ))),
                }
            }
            Cardinality::Multiple => {
                Ok(Container::from_singles(singles)?.map_or(Self::Null, Self::Multiple))
            }
            Cardinality::Ordered => {
                Ok(Container::from_singles(singles)?.map_or(Self::Null, Self::Ordered))
            }
            Cardinality::Record => Err(Error::new(ErrorKind::InvalidContainer(
                "records are built from fields, not single values".to_string(),
            ))),
        }
    }

    /// Decomposes a value into its single values.
    ///
    /// NULL yields an empty list; records yield their field values in
    /// field order (use [`Value::to_fields`] to keep the names).
    #[must_use]
    pub fn to_singles(&self) -> Vec<SingleValue> {
        match self {
            Self::Null => Vec::new(),
            Self::Single(v) => vec![v.clone()],
            Self::Multiple(c) | Self::Ordered(c) => c.iter().cloned().collect(),
            Self::Record(r) => r.iter().map(|(_, v)| v.clone()).collect(),
        }
    }

    /// Builds a record from named fields. No fields yields NULL.
    pub fn from_fields(fields: impl IntoIterator<Item = (Identifier, SingleValue)>) -> Self {
        let map: im::OrdMap<Identifier, SingleValue> = fields.into_iter().collect();
        if map.is_empty() {
            Self::Null
        } else {
            Self::Record(Record(map))
        }
    }

    /// Decomposes a record into its named fields; other values yield none.
    #[must_use]
    pub fn to_fields(&self) -> Vec<(Identifier, SingleValue)> {
        match self {
            Self::Record(r) => r.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        }
    }

    /// Creates a single boolean.
    #[must_use]
    pub const fn boolean(b: bool) -> Self {
        Self::Single(SingleValue::Boolean(b))
    }

    /// Creates a single integer.
    #[must_use]
    pub const fn integer(n: i64) -> Self {
        Self::Single(SingleValue::Integer(n))
    }

    /// Creates a single float.
    #[must_use]
    pub const fn float(n: f64) -> Self {
        Self::Single(SingleValue::Float(n))
    }

    /// Creates a single duration in seconds.
    #[must_use]
    pub const fn duration(secs: f64) -> Self {
        Self::Single(SingleValue::Duration(secs))
    }

    /// Creates a single string.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::Single(SingleValue::String(s.into()))
    }

    /// Creates a single identifier.
    pub fn identifier(id: impl Into<Identifier>) -> Self {
        Self::Single(SingleValue::Identifier(id.into()))
    }

    /// Returns true for NULL and for the empty string.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Single(SingleValue::String(s)) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns the signature of this value, or `None` for NULL.
    #[must_use]
    pub const fn signature(&self) -> Option<Signature> {
        match self {
            Self::Null => None,
            Self::Single(v) => Some(Signature::Single(v.base_type())),
            Self::Multiple(c) => Some(Signature::Multiple(c.base_type())),
            Self::Ordered(c) => Some(Signature::Ordered(c.base_type())),
            Self::Record(_) => Some(Signature::Record),
        }
    }

    /// Returns the cardinality, or `None` for NULL.
    #[must_use]
    pub const fn cardinality(&self) -> Option<Cardinality> {
        match self.signature() {
            Some(sig) => Some(sig.cardinality()),
            None => None,
        }
    }

    /// Returns the base type, or `None` for NULL and records.
    #[must_use]
    pub const fn base_type(&self) -> Option<BaseType> {
        match self.signature() {
            Some(sig) => sig.base_type(),
            None => None,
        }
    }

    /// Returns true if this value may populate a slot of `signature`.
    ///
    /// NULL conforms to every signature.
    #[must_use]
    pub fn conforms_to(&self, signature: Signature) -> bool {
        self.signature()
            .is_none_or(|actual| Signature::matches(signature, actual))
    }

    /// Converts this value for a slot of `signature`.
    ///
    /// # Errors
    /// Returns a signature mismatch if the value does not conform.
    pub fn coerce_to(&self, signature: Signature) -> Result<Self> {
        let Some(actual) = self.signature() else {
            return Ok(Self::Null);
        };
        if !Signature::matches(signature, actual) {
            return Err(Error::signature_mismatch(signature, actual));
        }
        let Some(target) = signature.base_type() else {
            return Ok(self.clone());
        };
        let mismatch = || Error::signature_mismatch(signature, actual);
        match self {
            Self::Single(v) => v.coerce_to(target).map(Self::Single).ok_or_else(mismatch),
            Self::Multiple(c) => c
                .map_singles(|v| v.coerce_to(target))
                .map(Self::Multiple)
                .ok_or_else(mismatch),
            Self::Ordered(c) => c
                .map_singles(|v| v.coerce_to(target))
                .map(Self::Ordered)
                .ok_or_else(mismatch),
            Self::Null | Self::Record(_) => Ok(self.clone()),
        }
    }

    /// Returns the single value, if this is a single.
    #[must_use]
    pub const fn as_single(&self) -> Option<&SingleValue> {
        match self {
            Self::Single(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a single boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Single(v) => v.as_bool(),
            _ => None,
        }
    }

    /// Returns the numeric operand, if this is a single number or duration.
    #[must_use]
    pub const fn as_number(&self) -> Option<Number> {
        match self {
            Self::Single(v) => v.as_number(),
            _ => None,
        }
    }

    /// Returns the container, if this is a multiple or ordered value.
    #[must_use]
    pub const fn as_container(&self) -> Option<&Container> {
        match self {
            Self::Multiple(c) | Self::Ordered(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the record, if this is a record.
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Single(a), Self::Single(b)) => a == b,
            (Self::Multiple(a), Self::Multiple(b)) => a.bag_eq(b),
            (Self::Ordered(a), Self::Ordered(b)) => a.seq_eq(b),
            (Self::Record(a), Self::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Single(v) => write!(f, "{v:?}"),
            Self::Multiple(c) => write!(f, "multiple{c:?}"),
            Self::Ordered(c) => write!(f, "ordered{c:?}"),
            Self::Record(r) => write!(f, "record{r:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, c: &Container) -> fmt::Result {
            for (i, v) in c.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v}")?;
            }
            Ok(())
        }
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Single(v) => write!(f, "{v}"),
            Self::Multiple(c) => {
                write!(f, "[")?;
                join(f, c)?;
                write!(f, "]")
            }
            Self::Ordered(c) => {
                write!(f, "<")?;
                join(f, c)?;
                write!(f, ">")
            }
            Self::Record(r) => {
                write!(f, "{{")?;
                for (i, (k, v)) in r.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<SingleValue> for Value {
    fn from(v: SingleValue) -> Self {
        Self::Single(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::float(n)
    }
}
