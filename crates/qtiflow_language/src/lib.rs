//! Processing language and control-object trees for qtiflow.
//!
//! This crate provides:
//! - [`Expression`] and [`Rule`] - Processing trees for response and outcome processing
//! - [`TemplateLibrary`] - Shared response-processing templates
//! - [`AssessmentItem`] and [`AssessmentTest`] - Items and the control-object tree
//! - [`check_jump`] - Forward-only branch-rule legality
//! - [`Validator`] - Static validation with path-addressed diagnostics

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod control;
pub mod expression;
pub mod item;
pub mod jump;
pub mod path;
pub mod rule;
pub mod template;
pub mod validation;

pub use control::{
    AssessmentTest, BranchRule, BranchTarget, ControlKind, ControlNode, ItemSessionControl,
    NavigationMode, NodeId, SubmissionMode, TestBuilder,
};
pub use expression::{BinaryOp, Expression, NaryOp, UnaryOp};
pub use item::AssessmentItem;
pub use jump::{JumpDestination, JumpViolation, check_jump};
pub use path::NodePath;
pub use rule::{Branch, ConditionRule, ProcessingKind, ProcessingTree, Rule};
pub use template::{MAP_RESPONSE, MATCH_CORRECT, TemplateLibrary};
pub use validation::{Diagnostic, DiagnosticKind, Severity, ValidationReport, Validator};
