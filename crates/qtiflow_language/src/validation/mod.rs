//! Static validation of items and tests.
//!
//! Validation never stops at the first problem: every diagnostic is
//! collected into a [`ValidationReport`] with the path of the offending
//! node.

pub mod diagnostic;
pub mod validator;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity, ValidationReport};
pub use validator::Validator;
