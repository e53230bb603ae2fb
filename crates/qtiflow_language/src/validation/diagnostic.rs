//! Diagnostics and validation reports.

use std::fmt;

use crate::path::NodePath;

/// How serious a diagnostic is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Harmless but suspicious.
    Warning,
    /// The node is statically invalid.
    Error,
}

/// What a diagnostic is about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// An expression or value has the wrong signature.
    SignatureMismatch,
    /// A variable, item, or branch target does not resolve.
    UnresolvedReference,
    /// An author declaration uses a built-in name.
    ReservedIdentifier,
    /// A declaration or control object identifier is used twice.
    DuplicateIdentifier,
    /// `lookupOutcomeValue` on a variable without a lookup table.
    MissingLookupTable,
    /// `mapResponse` on a variable without a mapping.
    MissingMapping,
    /// A declaration carries something its kind or cardinality forbids.
    InvalidDeclaration,
    /// An attribute value is out of range.
    InvalidAttribute,
    /// A rule targets a variable of the wrong kind.
    WrongVariableKind,
    /// A branch rule target violates the forward-only ordering.
    IllegalBranchTarget,
    /// A rule appears in processing that does not allow it.
    MisplacedRule,
    /// A processing template is not available.
    UnresolvedTemplate,
    /// A rule body or processing element is empty.
    EmptyBody,
    /// A lookup table repeats a source key.
    DuplicateLookupSource,
    /// A precondition or branch rule sits where jumps are disabled.
    IgnoredNavigationRule,
}

/// One finding of the validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: Severity,
    /// Category.
    pub kind: DiagnosticKind,
    /// The offending node.
    pub path: NodePath,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    #[must_use]
    pub fn error(kind: DiagnosticKind, path: NodePath, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            path,
            message: message.into(),
        }
    }

    /// Creates a warning diagnostic.
    #[must_use]
    pub fn warning(kind: DiagnosticKind, path: NodePath, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            path,
            message: message.into(),
        }
    }

    /// Returns true for errors.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level} at {}: {}", self.path, self.message)
    }
}

/// All diagnostics of one validation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Records an error.
    pub fn error(&mut self, kind: DiagnosticKind, path: &NodePath, message: impl Into<String>) {
        self.push(Diagnostic::error(kind, path.clone(), message));
    }

    /// Records a warning.
    pub fn warning(&mut self, kind: DiagnosticKind, path: &NodePath, message: impl Into<String>) {
        self.push(Diagnostic::warning(kind, path.clone(), message));
    }

    /// Appends another report.
    pub fn extend(&mut self, other: ValidationReport) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Iterates over every diagnostic in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Iterates over the errors.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Iterates over the warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Returns true if there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if any diagnostic has `kind`.
    #[must_use]
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    /// Returns the number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Returns true if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl IntoIterator for ValidationReport {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}
