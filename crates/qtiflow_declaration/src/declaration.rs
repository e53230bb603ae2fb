//! Variable declarations and the per-item / per-test declaration set.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use qtiflow_foundation::{BaseType, Identifier, Signature, SingleValue, Value};

use crate::lookup::LookupTable;
use crate::mapping::Mapping;

/// Built-in response variable counting response processing runs.
pub const NUM_ATTEMPTS: &str = "numAttempts";
/// Built-in response variable holding elapsed session time.
pub const DURATION: &str = "duration";
/// Built-in outcome variable tracking item completion.
pub const COMPLETION_STATUS: &str = "completionStatus";

/// `completionStatus` before the first response processing run.
pub const NOT_ATTEMPTED: &str = "not_attempted";
/// `completionStatus` after response processing.
pub const COMPLETED: &str = "completed";

/// Names authors may not declare.
pub const RESERVED_IDENTIFIERS: [&str; 3] = [DURATION, COMPLETION_STATUS, NUM_ATTEMPTS];

/// Returns true if `identifier` names a built-in variable.
#[must_use]
pub fn is_reserved_identifier(identifier: &str) -> bool {
    RESERVED_IDENTIFIERS.contains(&identifier)
}

/// The kind of a session variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VariableKind {
    /// Candidate response.
    Response,
    /// Processing result.
    Outcome,
    /// Template variable (read-only during processing).
    Template,
}

impl VariableKind {
    /// Returns the QTI name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Response => "response",
            Self::Outcome => "outcome",
            Self::Template => "template",
        }
    }
}

/// Declaration of one session variable.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableDeclaration {
    /// Variable identifier.
    pub identifier: Identifier,
    /// Variable kind.
    pub kind: VariableKind,
    /// Declared signature.
    pub signature: Signature,
    /// Value assigned at session start.
    pub default: Option<Value>,
    /// Lookup table (outcome variables only).
    pub lookup_table: Option<LookupTable>,
    /// Correct response (response variables only).
    pub correct_response: Option<Value>,
    /// Response mapping (response variables only).
    pub mapping: Option<Mapping>,
    /// True for variables provided by the engine.
    pub builtin: bool,
}

impl VariableDeclaration {
    /// Creates a declaration.
    #[must_use]
    pub fn new(identifier: impl Into<Identifier>, kind: VariableKind, signature: Signature) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            signature,
            default: None,
            lookup_table: None,
            correct_response: None,
            mapping: None,
            builtin: false,
        }
    }

    /// Creates a response declaration.
    #[must_use]
    pub fn response(identifier: impl Into<Identifier>, signature: Signature) -> Self {
        Self::new(identifier, VariableKind::Response, signature)
    }

    /// Creates an outcome declaration.
    #[must_use]
    pub fn outcome(identifier: impl Into<Identifier>, signature: Signature) -> Self {
        Self::new(identifier, VariableKind::Outcome, signature)
    }

    /// Creates a template declaration.
    #[must_use]
    pub fn template(identifier: impl Into<Identifier>, signature: Signature) -> Self {
        Self::new(identifier, VariableKind::Template, signature)
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Attaches a lookup table.
    #[must_use]
    pub fn with_lookup_table(mut self, table: LookupTable) -> Self {
        self.lookup_table = Some(table);
        self
    }

    /// Sets the correct response.
    #[must_use]
    pub fn with_correct_response(mut self, correct: impl Into<Value>) -> Self {
        self.correct_response = Some(correct.into());
        self
    }

    /// Attaches a response mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    /// Returns the value a fresh session starts with: the default or NULL.
    #[must_use]
    pub fn initial_value(&self) -> Value {
        self.default.clone().unwrap_or_default()
    }

    /// Returns true for outcome variables.
    #[must_use]
    pub fn is_outcome(&self) -> bool {
        self.kind == VariableKind::Outcome
    }

    /// Returns true for response variables.
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.kind == VariableKind::Response
    }
}

/// The ordered declarations of one item or test.
///
/// Lookup by identifier returns the first declaration with that name, so
/// built-ins shadow author redeclarations. Duplicates are kept for the
/// validator to report.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Declarations {
    declarations: Vec<VariableDeclaration>,
    index: HashMap<Identifier, usize>,
}

impl Declarations {
    /// Creates an empty set without built-ins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an item declaration set seeded with the item built-ins.
    #[must_use]
    pub fn item() -> Self {
        Self::new()
            .with(
                VariableDeclaration::response(NUM_ATTEMPTS, Signature::Single(BaseType::Integer))
                    .with_default(0i64)
                    .builtin(),
            )
            .with(
                VariableDeclaration::response(DURATION, Signature::Single(BaseType::Duration))
                    .with_default(Value::duration(0.0))
                    .builtin(),
            )
            .with(
                VariableDeclaration::outcome(
                    COMPLETION_STATUS,
                    Signature::Single(BaseType::Identifier),
                )
                .with_default(Value::Single(SingleValue::identifier(NOT_ATTEMPTED)))
                .builtin(),
            )
    }

    /// Creates a test declaration set seeded with the test built-ins.
    #[must_use]
    pub fn test() -> Self {
        Self::new().with(
            VariableDeclaration::response(DURATION, Signature::Single(BaseType::Duration))
                .with_default(Value::duration(0.0))
                .builtin(),
        )
    }

    /// Adds a declaration.
    pub fn declare(&mut self, declaration: VariableDeclaration) {
        let position = self.declarations.len();
        self.index
            .entry(declaration.identifier.clone())
            .or_insert(position);
        self.declarations.push(declaration);
    }

    /// Adds a declaration (builder form).
    #[must_use]
    pub fn with(mut self, declaration: VariableDeclaration) -> Self {
        self.declare(declaration);
        self
    }

    /// Returns the declaration for `identifier`.
    #[must_use]
    pub fn get(&self, identifier: &Identifier) -> Option<&VariableDeclaration> {
        self.index.get(identifier).map(|&i| &self.declarations[i])
    }

    /// Iterates over all declarations in declaration order, duplicates
    /// included.
    pub fn iter(&self) -> impl Iterator<Item = &VariableDeclaration> {
        self.declarations.iter()
    }

    /// Returns true if the declaration at `position` is the one lookups
    /// resolve to.
    #[must_use]
    pub fn is_primary(&self, position: usize) -> bool {
        self.declarations
            .get(position)
            .and_then(|d| self.index.get(&d.identifier))
            .is_some_and(|&i| i == position)
    }

    /// Returns the number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns true if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
