//! Error types for the qtiflow system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::identifier::{Identifier, VariableRef};
use crate::types::{BaseType, Signature};

/// The main error type for qtiflow operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a signature mismatch error.
    #[must_use]
    pub fn signature_mismatch(expected: Signature, actual: Signature) -> Self {
        Self::new(ErrorKind::SignatureMismatch { expected, actual })
    }

    /// Creates an invalid operand error.
    #[must_use]
    pub fn invalid_operand(operator: &'static str, found: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperand {
            operator,
            found: found.into(),
        })
    }

    /// Creates an undeclared variable error.
    #[must_use]
    pub fn undeclared(reference: &VariableRef) -> Self {
        Self::new(ErrorKind::UndeclaredVariable(reference.to_string()))
    }

    /// Creates a navigation error.
    #[must_use]
    pub fn navigation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Navigation(message.into()))
    }

    /// Creates an illegal jump error.
    #[must_use]
    pub fn illegal_jump(from: Identifier, target: Identifier, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalJump {
            from,
            target,
            reason: reason.into(),
        })
    }

    /// Returns true if this error must abort the current engine call.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A value or expression does not have the required signature.
    #[error("signature mismatch: expected {expected}, got {actual}")]
    SignatureMismatch {
        /// The required signature.
        expected: Signature,
        /// The signature encountered.
        actual: Signature,
    },

    /// A container was built from values of differing base types.
    #[error("mixed base types in container: expected {expected}, got {actual}")]
    MixedBaseTypes {
        /// The base type of the first element.
        expected: BaseType,
        /// The offending base type.
        actual: BaseType,
    },

    /// A container value was built with the wrong number of elements.
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    /// An operator received an operand it cannot handle.
    #[error("invalid operand for {operator}: {found}")]
    InvalidOperand {
        /// The operator name.
        operator: &'static str,
        /// Description of the operand found.
        found: String,
    },

    /// A qualified reference was used where only local variables exist.
    #[error("qualified reference not allowed here: {0}")]
    QualifiedReference(String),

    /// An item reference identifier does not exist in the test.
    #[error("unknown item reference: {0}")]
    UnknownItemRef(Identifier),

    /// An item reference exists but its item could not be resolved.
    #[error("item referenced by {0} is not resolved")]
    ItemNotResolved(Identifier),

    /// A variable reference did not resolve to a declaration.
    #[error("undeclared variable: {0}")]
    UndeclaredVariable(String),

    /// A lookup was requested on a variable without a lookup table.
    #[error("variable {0} has no lookup table")]
    MissingLookupTable(Identifier),

    /// `mapResponse` was requested on a variable without a mapping.
    #[error("variable {0} has no response mapping")]
    MissingMapping(Identifier),

    /// A variable has the wrong kind for the operation.
    #[error("variable {identifier} is not a {expected} variable")]
    WrongVariableKind {
        /// The variable identifier.
        identifier: Identifier,
        /// The expected kind name.
        expected: &'static str,
    },

    /// A processing template could not be resolved.
    #[error("unresolved processing template: {0}")]
    UnresolvedTemplate(String),

    /// A branch-rule jump violates the forward-only ordering.
    #[error("illegal jump from {from} to {target}: {reason}")]
    IllegalJump {
        /// The node the jump originates from.
        from: Identifier,
        /// The jump target.
        target: Identifier,
        /// Why the jump is illegal.
        reason: String,
    },

    /// A control object identifier was not found in the test.
    #[error("unknown control object: {0}")]
    UnknownNode(Identifier),

    /// A control-object tree was assembled with invalid nesting.
    #[error("invalid test structure: {0}")]
    InvalidStructure(String),

    /// A navigation call was made in a state that does not permit it.
    #[error("navigation error: {0}")]
    Navigation(String),

    /// A document failed validation when loaded.
    #[error("validation failed with {errors} error(s)")]
    ValidationFailed {
        /// Number of validation errors.
        errors: usize,
    },

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// Returns true for runtime flow errors, which abort the current call.
    ///
    /// Everything else is a recoverable evaluation failure: the rule that
    /// raised it is discarded and processing continues.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedTemplate(_)
                | Self::IllegalJump { .. }
                | Self::UnknownNode(_)
                | Self::InvalidStructure(_)
                | Self::Navigation(_)
                | Self::ValidationFailed { .. }
                | Self::Internal(_)
        )
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Path of the node being processed.
    pub path: Option<String>,
    /// Enclosing rule frames, innermost last.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the node path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "at {path}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
