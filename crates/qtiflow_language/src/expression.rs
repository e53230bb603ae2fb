//! Expression trees.
//!
//! Expressions form a closed enum. Operators describe the operand
//! signatures they accept per argument position; the validator checks
//! those statically and the evaluator trusts them.

use qtiflow_foundation::{BaseType, Cardinality, Identifier, SingleValue, VariableRef};

const ANY_CARDINALITY: &[Cardinality] = &[
    Cardinality::Single,
    Cardinality::Multiple,
    Cardinality::Ordered,
    Cardinality::Record,
];
const SINGLE: &[Cardinality] = &[Cardinality::Single];
const CONTAINER: &[Cardinality] = &[Cardinality::Multiple, Cardinality::Ordered];

const ANY_BASE_TYPE: &[BaseType] = &BaseType::ALL;
const NUMERIC: &[BaseType] = &BaseType::NUMERIC;
const BOOLEAN: &[BaseType] = &[BaseType::Boolean];
const DURATION: &[BaseType] = &[BaseType::Duration];
const COMPARABLE: &[BaseType] = &[
    BaseType::Identifier,
    BaseType::Boolean,
    BaseType::Integer,
    BaseType::Float,
    BaseType::String,
    BaseType::Point,
    BaseType::Pair,
    BaseType::DirectedPair,
    BaseType::Uri,
];

/// Single-operand operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Boolean negation.
    Not,
    /// True when the operand is NULL.
    IsNull,
    /// Number of elements of a container; 0 for NULL.
    ContainerSize,
}

impl UnaryOp {
    /// Returns the QTI element name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::IsNull => "isNull",
            Self::ContainerSize => "containerSize",
        }
    }

    /// Cardinalities accepted by the operand.
    #[must_use]
    pub const fn required_cardinalities(self) -> &'static [Cardinality] {
        match self {
            Self::Not => SINGLE,
            Self::IsNull => ANY_CARDINALITY,
            Self::ContainerSize => CONTAINER,
        }
    }

    /// Base types accepted by the operand.
    #[must_use]
    pub const fn required_base_types(self) -> &'static [BaseType] {
        match self {
            Self::Not => BOOLEAN,
            Self::IsNull | Self::ContainerSize => ANY_BASE_TYPE,
        }
    }
}

/// Operators over any number of operands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NaryOp {
    /// Logical conjunction.
    And,
    /// Logical disjunction.
    Or,
    /// Numeric sum.
    Sum,
    /// Numeric product.
    Product,
    /// Bag of all operand elements.
    Multiple,
    /// Sequence of all operand elements.
    Ordered,
}

impl NaryOp {
    /// Returns the QTI element name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Sum => "sum",
            Self::Product => "product",
            Self::Multiple => "multiple",
            Self::Ordered => "ordered",
        }
    }

    /// Cardinalities accepted by every operand.
    #[must_use]
    pub const fn required_cardinalities(self) -> &'static [Cardinality] {
        match self {
            Self::And | Self::Or | Self::Sum | Self::Product => SINGLE,
            Self::Multiple => &[Cardinality::Single, Cardinality::Multiple],
            Self::Ordered => &[Cardinality::Single, Cardinality::Ordered],
        }
    }

    /// Base types accepted by every operand.
    #[must_use]
    pub const fn required_base_types(self) -> &'static [BaseType] {
        match self {
            Self::And | Self::Or => BOOLEAN,
            Self::Sum | Self::Product => NUMERIC,
            Self::Multiple | Self::Ordered => ANY_BASE_TYPE,
        }
    }
}

/// Two-operand operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// Numeric difference.
    Subtract,
    /// Numeric quotient; NULL when dividing by zero.
    Divide,
    /// Numeric less-than.
    Lt,
    /// Numeric less-than-or-equal.
    Lte,
    /// Numeric greater-than.
    Gt,
    /// Numeric greater-than-or-equal.
    Gte,
    /// Exact numeric equality.
    Equal,
    /// Structural equality of two values with the same signature.
    Match,
    /// True when the single left operand occurs in the right container.
    Member,
    /// True when the right container occurs in the left container.
    Contains,
    /// Duration less-than.
    DurationLt,
    /// Duration greater-than-or-equal.
    DurationGte,
}

impl BinaryOp {
    /// Returns the QTI element name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Subtract => "subtract",
            Self::Divide => "divide",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Equal => "equal",
            Self::Match => "match",
            Self::Member => "member",
            Self::Contains => "contains",
            Self::DurationLt => "durationLT",
            Self::DurationGte => "durationGTE",
        }
    }

    /// Cardinalities accepted at `position` (0 = left, 1 = right).
    #[must_use]
    pub const fn required_cardinalities(self, position: usize) -> &'static [Cardinality] {
        match self {
            Self::Match => &[Cardinality::Single, Cardinality::Multiple, Cardinality::Ordered],
            Self::Member if position == 0 => SINGLE,
            Self::Member | Self::Contains => CONTAINER,
            _ => SINGLE,
        }
    }

    /// Base types accepted at `position`.
    #[must_use]
    pub const fn required_base_types(self, _position: usize) -> &'static [BaseType] {
        match self {
            Self::Subtract
            | Self::Divide
            | Self::Lt
            | Self::Lte
            | Self::Gt
            | Self::Gte
            | Self::Equal => NUMERIC,
            Self::Match | Self::Member | Self::Contains => COMPARABLE,
            Self::DurationLt | Self::DurationGte => DURATION,
        }
    }

    /// Returns true if both operands must share one base type.
    #[must_use]
    pub const fn requires_same_base_type(self) -> bool {
        matches!(self, Self::Match | Self::Member | Self::Contains)
    }

    /// Returns true if both operands must share one cardinality.
    #[must_use]
    pub const fn requires_same_cardinality(self) -> bool {
        matches!(self, Self::Match | Self::Contains)
    }
}

/// An expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// A literal single value.
    BaseValue(SingleValue),
    /// The NULL literal.
    Null,
    /// Current value of a variable.
    Variable(VariableRef),
    /// Declared default of a variable.
    Default(VariableRef),
    /// Correct response of a response variable.
    Correct(Identifier),
    /// Mapped score of a response variable.
    MapResponse(Identifier),
    /// Random integer from `min..=max` in steps of `step`.
    RandomInteger {
        /// Smallest value.
        min: i64,
        /// Largest value.
        max: i64,
        /// Step between candidate values.
        step: i64,
    },
    /// Random float from `min..=max`.
    RandomFloat {
        /// Smallest value.
        min: f64,
        /// Largest value.
        max: f64,
    },
    /// Single-operand operator.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expression>,
    },
    /// Operator over a list of operands.
    Nary {
        /// The operator.
        op: NaryOp,
        /// The operands, in order.
        operands: Vec<Expression>,
    },
    /// Two-operand operator.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
    },
    /// The `n`th (1-based) element of an ordered container.
    Index {
        /// The container.
        operand: Box<Expression>,
        /// 1-based position.
        n: i64,
    },
    /// A field of a record.
    FieldValue {
        /// The record.
        record: Box<Expression>,
        /// Field identifier.
        field: Identifier,
    },
}

impl Expression {
    /// Returns the QTI element name of this node.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BaseValue(_) => "baseValue",
            Self::Null => "null",
            Self::Variable(_) => "variable",
            Self::Default(_) => "default",
            Self::Correct(_) => "correct",
            Self::MapResponse(_) => "mapResponse",
            Self::RandomInteger { .. } => "randomInteger",
            Self::RandomFloat { .. } => "randomFloat",
            Self::Unary { op, .. } => op.name(),
            Self::Nary { op, .. } => op.name(),
            Self::Binary { op, .. } => op.name(),
            Self::Index { .. } => "index",
            Self::FieldValue { .. } => "fieldValue",
        }
    }

    /// Returns the path segment naming this node.
    #[must_use]
    pub fn segment(&self) -> String {
        match self {
            Self::Variable(r) | Self::Default(r) => format!("{}[{r}]", self.name()),
            Self::Correct(id) | Self::MapResponse(id) => format!("{}[{id}]", self.name()),
            Self::FieldValue { field, .. } => format!("fieldValue[{field}]"),
            _ => self.name().to_string(),
        }
    }

    /// Creates a literal.
    pub fn base(value: impl Into<SingleValue>) -> Self {
        Self::BaseValue(value.into())
    }

    /// Creates a variable read (`itemRef.variable` or `variable`).
    pub fn variable(reference: impl Into<VariableRef>) -> Self {
        Self::Variable(reference.into())
    }

    /// Creates a default-value read.
    pub fn default_of(reference: impl Into<VariableRef>) -> Self {
        Self::Default(reference.into())
    }

    /// Creates a correct-response read.
    pub fn correct(identifier: impl Into<Identifier>) -> Self {
        Self::Correct(identifier.into())
    }

    /// Creates a mapped-response read.
    pub fn map_response(identifier: impl Into<Identifier>) -> Self {
        Self::MapResponse(identifier.into())
    }

    /// Creates a unary operation.
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Creates an n-ary operation.
    #[must_use]
    pub fn nary(op: NaryOp, operands: Vec<Expression>) -> Self {
        Self::Nary { op, operands }
    }

    /// Creates a binary operation.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `not(operand)`.
    #[must_use]
    pub fn not(operand: Expression) -> Self {
        Self::unary(UnaryOp::Not, operand)
    }

    /// `isNull(operand)`.
    #[must_use]
    pub fn is_null(operand: Expression) -> Self {
        Self::unary(UnaryOp::IsNull, operand)
    }

    /// `and(operands)`.
    #[must_use]
    pub fn and(operands: Vec<Expression>) -> Self {
        Self::nary(NaryOp::And, operands)
    }

    /// `or(operands)`.
    #[must_use]
    pub fn or(operands: Vec<Expression>) -> Self {
        Self::nary(NaryOp::Or, operands)
    }

    /// `sum(operands)`.
    #[must_use]
    pub fn sum(operands: Vec<Expression>) -> Self {
        Self::nary(NaryOp::Sum, operands)
    }

    /// `match(left, right)`.
    #[must_use]
    pub fn matches(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOp::Match, left, right)
    }

    /// `gte(left, right)`.
    #[must_use]
    pub fn gte(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOp::Gte, left, right)
    }

    /// `lt(left, right)`.
    #[must_use]
    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOp::Lt, left, right)
    }

    /// `index(operand, n)`.
    #[must_use]
    pub fn index(operand: Expression, n: i64) -> Self {
        Self::Index {
            operand: Box::new(operand),
            n,
        }
    }

    /// `fieldValue(record, field)`.
    pub fn field_value(record: Expression, field: impl Into<Identifier>) -> Self {
        Self::FieldValue {
            record: Box::new(record),
            field: field.into(),
        }
    }

    /// Returns the direct sub-expressions in operand order.
    #[must_use]
    pub fn operands(&self) -> Vec<&Expression> {
        match self {
            Self::Unary { operand, .. } | Self::Index { operand, .. } => vec![&**operand],
            Self::FieldValue { record, .. } => vec![&**record],
            Self::Nary { operands, .. } => operands.iter().collect(),
            Self::Binary { left, right, .. } => vec![&**left, &**right],
            Self::BaseValue(_)
            | Self::Null
            | Self::Variable(_)
            | Self::Default(_)
            | Self::Correct(_)
            | Self::MapResponse(_)
            | Self::RandomInteger { .. }
            | Self::RandomFloat { .. } => Vec::new(),
        }
    }
}

impl From<bool> for Expression {
    fn from(b: bool) -> Self {
        Self::base(b)
    }
}
