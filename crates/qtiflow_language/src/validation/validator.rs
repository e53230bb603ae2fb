//! The static validation pass.
//!
//! Every composite validates itself and then its children, collecting all
//! diagnostics instead of stopping at the first error.

use std::collections::HashSet;

use qtiflow_declaration::{Declarations, Scope, VariableKind, is_reserved_identifier};
use qtiflow_foundation::{BaseType, Cardinality, Identifier, Signature};

use crate::control::{AssessmentTest, ControlKind};
use crate::expression::{BinaryOp, Expression, NaryOp, UnaryOp};
use crate::item::AssessmentItem;
use crate::jump::check_jump;
use crate::path::NodePath;
use crate::rule::{ProcessingKind, ProcessingTree, Rule, branch_segment, else_segment};
use crate::template::TemplateLibrary;
use crate::validation::diagnostic::{DiagnosticKind, ValidationReport};

const SINGLE: &[Cardinality] = &[Cardinality::Single];
const ORDERED: &[Cardinality] = &[Cardinality::Ordered];
const RECORD: &[Cardinality] = &[Cardinality::Record];

/// Validates processing trees, items and tests.
#[derive(Clone, Copy, Debug)]
pub struct Validator<'t> {
    templates: &'t TemplateLibrary,
}

impl<'t> Validator<'t> {
    /// Creates a validator resolving templates from `templates`.
    #[must_use]
    pub const fn new(templates: &'t TemplateLibrary) -> Self {
        Self { templates }
    }

    /// Validates one processing tree against `scope`.
    #[must_use]
    pub fn validate_processing(
        &self,
        tree: &ProcessingTree,
        scope: &dyn Scope,
        path: &NodePath,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        self.processing(tree, scope, path, &mut report);
        report
    }

    /// Validates an item's declarations and response processing.
    #[must_use]
    pub fn validate_item(&self, item: &AssessmentItem) -> ValidationReport {
        let mut report = ValidationReport::new();
        self.item(item, &item.path(), &mut report);
        report
    }

    /// Validates a test: declarations, control objects, navigation rules,
    /// referenced items, and outcome processing.
    #[must_use]
    pub fn validate_test(&self, test: &AssessmentTest) -> ValidationReport {
        let mut report = ValidationReport::new();
        let root_path = test.path(test.root());
        declarations(test.declarations(), &root_path, &mut report);

        let scope = test.scope();
        let mut seen = HashSet::new();
        for (id, node) in test.nodes() {
            let path = test.path(id);

            if !seen.insert(node.identifier.clone()) {
                report.error(
                    DiagnosticKind::DuplicateIdentifier,
                    &path,
                    format!("duplicate control object identifier {}", node.identifier),
                );
            }

            if let Some(limit) = node.time_limit {
                if limit.is_nan() || limit < 0.0 {
                    report.error(
                        DiagnosticKind::InvalidAttribute,
                        &path,
                        format!("time limit must not be negative, got {limit}"),
                    );
                }
            }

            if node.is_item_ref() {
                match node.item() {
                    Some(item) => {
                        self.item(item, &path.join(&item.path()), &mut report);
                        if let ControlKind::ItemRef { mappings, .. } = &node.kind {
                            for (source, target) in mappings.iter() {
                                if item.declarations.get(target).is_none() {
                                    report.error(
                                        DiagnosticKind::UnresolvedReference,
                                        &path.child_named("variableMapping", source),
                                        format!("item {} does not declare {target}", item.identifier),
                                    );
                                }
                            }
                        }
                    }
                    None => report.error(
                        DiagnosticKind::UnresolvedReference,
                        &path,
                        format!("item referenced by {} is not resolved", node.identifier),
                    ),
                }
            }

            let enabled = test.jumps_enabled(id);
            for precondition in &node.preconditions {
                let pre_path = path.child("preCondition");
                if enabled {
                    Pass::new(&scope, ProcessingKind::Outcome, &mut report)
                        .guard(precondition, &pre_path);
                } else {
                    report.warning(
                        DiagnosticKind::IgnoredNavigationRule,
                        &pre_path,
                        "preconditions are ignored outside linear individual test parts",
                    );
                }
            }

            for rule in &node.branch_rules {
                let rule_path = path.child_named("branchRule", &rule.target);
                if !enabled {
                    report.warning(
                        DiagnosticKind::IgnoredNavigationRule,
                        &rule_path,
                        "branch rules are ignored outside linear individual test parts",
                    );
                    continue;
                }
                if let Err(violation) = check_jump(test, id, &rule.target) {
                    let kind = if violation.is_unresolved() {
                        DiagnosticKind::UnresolvedReference
                    } else {
                        DiagnosticKind::IllegalBranchTarget
                    };
                    report.error(kind, &rule_path, violation.to_string());
                }
                Pass::new(&scope, ProcessingKind::Outcome, &mut report).guard(&rule.guard, &rule_path);
            }
        }

        if let Some(tree) = test.outcome_processing() {
            self.processing(tree, &scope, &root_path.child(tree.kind.name()), &mut report);
        }
        report
    }

    fn item(&self, item: &AssessmentItem, path: &NodePath, report: &mut ValidationReport) {
        declarations(&item.declarations, path, report);
        if let Some(tree) = &item.response_processing {
            self.processing(tree, &*item.declarations, &path.child(tree.kind.name()), report);
        }
    }

    fn processing(
        &self,
        tree: &ProcessingTree,
        scope: &dyn Scope,
        path: &NodePath,
        report: &mut ValidationReport,
    ) {
        if tree.is_empty() {
            report.warning(DiagnosticKind::EmptyBody, path, "processing has no rules");
            return;
        }
        match tree.resolve(self.templates) {
            Ok(rules) => Pass::new(scope, tree.kind, report).rules(&rules, path),
            Err(err) => report.error(DiagnosticKind::UnresolvedTemplate, path, err.to_string()),
        }
    }
}

// =============================================================================
// Declarations
// =============================================================================

fn declarations(declarations: &Declarations, path: &NodePath, report: &mut ValidationReport) {
    for (position, decl) in declarations.iter().enumerate() {
        if decl.builtin {
            continue;
        }
        let path = path.child_named(&format!("{}Declaration", decl.kind.name()), &decl.identifier);

        if is_reserved_identifier(decl.identifier.as_str()) {
            report.error(
                DiagnosticKind::ReservedIdentifier,
                &path,
                format!("{} is a reserved identifier", decl.identifier),
            );
        } else if !declarations.is_primary(position) {
            report.error(
                DiagnosticKind::DuplicateIdentifier,
                &path,
                format!("duplicate declaration of {}", decl.identifier),
            );
        }

        if let Some(default) = &decl.default {
            if !default.conforms_to(decl.signature) {
                report.error(
                    DiagnosticKind::SignatureMismatch,
                    &path.child("defaultValue"),
                    format!("expected {}, found {default}", decl.signature),
                );
            }
        }

        if let Some(correct) = &decl.correct_response {
            if !decl.is_response() {
                report.error(
                    DiagnosticKind::InvalidDeclaration,
                    &path,
                    "only response variables have a correct response",
                );
            } else if !correct.conforms_to(decl.signature) {
                report.error(
                    DiagnosticKind::SignatureMismatch,
                    &path.child("correctResponse"),
                    format!("expected {}, found {correct}", decl.signature),
                );
            }
        }

        if decl.mapping.is_some() && !decl.is_response() {
            report.error(
                DiagnosticKind::InvalidDeclaration,
                &path,
                "only response variables have a mapping",
            );
        }

        if let Some(table) = &decl.lookup_table {
            let table_path = path.child(if table.is_match_table() {
                "matchTable"
            } else {
                "interpolationTable"
            });
            if !decl.is_outcome() || decl.signature.cardinality() != Cardinality::Single {
                report.error(
                    DiagnosticKind::InvalidDeclaration,
                    &table_path,
                    "lookup tables belong to single-cardinality outcome variables",
                );
            } else if let Some(target) = decl.signature.base_type() {
                for produced in table.target_base_types() {
                    if !target.accepts(produced) {
                        report.error(
                            DiagnosticKind::SignatureMismatch,
                            &table_path,
                            format!("table produces {produced} but {} is {target}", decl.identifier),
                        );
                    }
                }
            }
            for key in table.duplicate_sources() {
                report.warning(
                    DiagnosticKind::DuplicateLookupSource,
                    &table_path,
                    format!("duplicate source value {key}; only the first entry can match"),
                );
            }
        }
    }
}

// =============================================================================
// Rules and Expressions
// =============================================================================

struct Pass<'a> {
    scope: &'a dyn Scope,
    kind: ProcessingKind,
    report: &'a mut ValidationReport,
}

impl<'a> Pass<'a> {
    fn new(scope: &'a dyn Scope, kind: ProcessingKind, report: &'a mut ValidationReport) -> Self {
        Self {
            scope,
            kind,
            report,
        }
    }

    fn rules(&mut self, rules: &[Rule], path: &NodePath) {
        for rule in rules {
            self.rule(rule, &path.child(rule.segment(self.kind)));
        }
    }

    fn body(&mut self, rules: &[Rule], path: &NodePath) {
        if rules.is_empty() {
            self.report
                .warning(DiagnosticKind::EmptyBody, path, "rule body is empty");
        }
        self.rules(rules, path);
    }

    fn rule(&mut self, rule: &Rule, path: &NodePath) {
        match rule {
            Rule::Condition(condition) => {
                for (position, branch) in condition.branches().enumerate() {
                    let branch_path = path.child(branch_segment(self.kind, position));
                    self.guard(&branch.guard, &branch_path);
                    self.body(&branch.rules, &branch_path);
                }
                if let Some(rules) = &condition.else_rules {
                    self.body(rules, &path.child(else_segment(self.kind)));
                }
            }
            Rule::SetOutcomeValue {
                identifier,
                expression,
            } => {
                let actual = self.expression(expression, path);
                self.assignment(identifier, VariableKind::Outcome, actual, path);
            }
            Rule::SetResponseValue {
                identifier,
                expression,
            } => {
                let actual = self.expression(expression, path);
                self.assignment(identifier, VariableKind::Response, actual, path);
            }
            Rule::LookupOutcomeValue {
                identifier,
                expression,
            } => {
                let actual = self.expression(expression, path);
                self.operand("lookupOutcomeValue", 0, actual, SINGLE, &BaseType::NUMERIC, path);
                match self.scope.resolve_local(identifier) {
                    None => self.unresolved(identifier, path),
                    Some(decl) if !decl.is_outcome() => self.wrong_kind(identifier, "outcome", path),
                    Some(decl) if decl.lookup_table.is_none() => self.report.error(
                        DiagnosticKind::MissingLookupTable,
                        path,
                        format!("{identifier} has no lookup table"),
                    ),
                    Some(_) => {}
                }
            }
            Rule::ExitResponse => {
                if self.kind == ProcessingKind::Outcome {
                    self.misplaced(rule, path);
                }
            }
            Rule::ExitTest => {
                if self.kind == ProcessingKind::Response {
                    self.misplaced(rule, path);
                }
            }
        }
    }

    fn assignment(
        &mut self,
        identifier: &Identifier,
        expected_kind: VariableKind,
        actual: Option<Signature>,
        path: &NodePath,
    ) {
        let Some(decl) = self.scope.resolve_local(identifier) else {
            self.unresolved(identifier, path);
            return;
        };
        if decl.kind != expected_kind {
            self.wrong_kind(identifier, expected_kind.name(), path);
            return;
        }
        if let Some(actual) = actual {
            if !Signature::matches(decl.signature, actual) {
                self.report.error(
                    DiagnosticKind::SignatureMismatch,
                    path,
                    format!("{identifier} expects {}, found {actual}", decl.signature),
                );
            }
        }
    }

    fn guard(&mut self, guard: &Expression, path: &NodePath) {
        let actual = self.expression(guard, path);
        self.operand("condition", 0, actual, SINGLE, &[BaseType::Boolean], path);
    }

    fn misplaced(&mut self, rule: &Rule, path: &NodePath) {
        self.report.error(
            DiagnosticKind::MisplacedRule,
            path,
            format!("{} is not allowed in {}", rule.segment(self.kind), self.kind.name()),
        );
    }

    fn unresolved(&mut self, identifier: impl std::fmt::Display, path: &NodePath) {
        self.report.error(
            DiagnosticKind::UnresolvedReference,
            path,
            format!("undeclared variable {identifier}"),
        );
    }

    fn wrong_kind(&mut self, identifier: impl std::fmt::Display, expected: &str, path: &NodePath) {
        self.report.error(
            DiagnosticKind::WrongVariableKind,
            path,
            format!("{identifier} is not a {expected} variable"),
        );
    }

    /// Checks one operand against the accepted cardinalities and base
    /// types. Unknown signatures pass.
    fn operand(
        &mut self,
        operator: &str,
        position: usize,
        actual: Option<Signature>,
        cardinalities: &[Cardinality],
        base_types: &[BaseType],
        path: &NodePath,
    ) -> Option<Signature> {
        let actual = actual?;
        if !cardinalities.contains(&actual.cardinality()) {
            self.report.error(
                DiagnosticKind::SignatureMismatch,
                path,
                format!(
                    "{operator} operand {}: expected cardinality {}, found {actual}",
                    position + 1,
                    join(cardinalities),
                ),
            );
            return None;
        }
        if let Some(bt) = actual.base_type() {
            if !base_types.iter().any(|r| r.accepts(bt)) {
                self.report.error(
                    DiagnosticKind::SignatureMismatch,
                    path,
                    format!(
                        "{operator} operand {}: expected base type {}, found {actual}",
                        position + 1,
                        join(base_types),
                    ),
                );
                return None;
            }
        }
        Some(actual)
    }

    /// Infers the signature of `expression`; `None` when unknown.
    #[allow(clippy::too_many_lines)]
    fn expression(&mut self, expression: &Expression, parent: &NodePath) -> Option<Signature> {
        let path = parent.child(expression.segment());
        match expression {
            Expression::BaseValue(v) => Some(Signature::Single(v.base_type())),
            Expression::Null => None,
            Expression::Variable(reference) | Expression::Default(reference) => {
                match self.scope.resolve(reference) {
                    Ok(decl) => Some(decl.signature),
                    Err(err) => {
                        self.report
                            .error(DiagnosticKind::UnresolvedReference, &path, err.to_string());
                        None
                    }
                }
            }
            Expression::Correct(identifier) => match self.scope.resolve_local(identifier) {
                None => {
                    self.unresolved(identifier, &path);
                    None
                }
                Some(decl) if !decl.is_response() => {
                    self.wrong_kind(identifier, "response", &path);
                    None
                }
                Some(decl) => Some(decl.signature),
            },
            Expression::MapResponse(identifier) => {
                match self.scope.resolve_local(identifier) {
                    None => self.unresolved(identifier, &path),
                    Some(decl) if !decl.is_response() => {
                        self.wrong_kind(identifier, "response", &path);
                    }
                    Some(decl) if decl.mapping.is_none() => self.report.error(
                        DiagnosticKind::MissingMapping,
                        &path,
                        format!("{identifier} has no mapping"),
                    ),
                    Some(_) => {}
                }
                Some(Signature::Single(BaseType::Float))
            }
            Expression::RandomInteger { min, max, step } => {
                if min > max || *step < 1 {
                    self.report.error(
                        DiagnosticKind::InvalidAttribute,
                        &path,
                        format!("invalid range {min}..={max} step {step}"),
                    );
                }
                Some(Signature::Single(BaseType::Integer))
            }
            Expression::RandomFloat { min, max } => {
                if min > max {
                    self.report.error(
                        DiagnosticKind::InvalidAttribute,
                        &path,
                        format!("invalid range {min}..={max}"),
                    );
                }
                Some(Signature::Single(BaseType::Float))
            }
            Expression::Unary { op, operand } => {
                let actual = self.expression(operand, &path);
                self.operand(
                    op.name(),
                    0,
                    actual,
                    op.required_cardinalities(),
                    op.required_base_types(),
                    &path,
                );
                match op {
                    UnaryOp::Not | UnaryOp::IsNull => Some(Signature::Single(BaseType::Boolean)),
                    UnaryOp::ContainerSize => Some(Signature::Single(BaseType::Integer)),
                }
            }
            Expression::Nary { op, operands } => {
                let mut signatures = Vec::with_capacity(operands.len());
                for (position, operand) in operands.iter().enumerate() {
                    let actual = self.expression(operand, &path);
                    signatures.push(self.operand(
                        op.name(),
                        position,
                        actual,
                        op.required_cardinalities(),
                        op.required_base_types(),
                        &path,
                    ));
                }
                self.nary_result(*op, &signatures, &path)
            }
            Expression::Binary { op, left, right } => {
                let left = self.expression(left, &path);
                let right = self.expression(right, &path);
                let left = self.operand(
                    op.name(),
                    0,
                    left,
                    op.required_cardinalities(0),
                    op.required_base_types(0),
                    &path,
                );
                let right = self.operand(
                    op.name(),
                    1,
                    right,
                    op.required_cardinalities(1),
                    op.required_base_types(1),
                    &path,
                );
                self.binary_result(*op, left, right, &path)
            }
            Expression::Index { operand, n } => {
                let actual = self.expression(operand, &path);
                let checked = self.operand("index", 0, actual, ORDERED, &BaseType::ALL, &path);
                if *n < 1 {
                    self.report.error(
                        DiagnosticKind::InvalidAttribute,
                        &path,
                        format!("index must be at least 1, got {n}"),
                    );
                }
                checked.and_then(|s| s.with_cardinality(Cardinality::Single))
            }
            Expression::FieldValue { record, .. } => {
                let actual = self.expression(record, &path);
                self.operand("fieldValue", 0, actual, RECORD, &BaseType::ALL, &path);
                None
            }
        }
    }

    fn nary_result(
        &mut self,
        op: NaryOp,
        signatures: &[Option<Signature>],
        path: &NodePath,
    ) -> Option<Signature> {
        match op {
            NaryOp::And | NaryOp::Or => Some(Signature::Single(BaseType::Boolean)),
            NaryOp::Sum | NaryOp::Product => numeric_result(signatures),
            NaryOp::Multiple | NaryOp::Ordered => {
                let mut base: Option<BaseType> = None;
                for bt in signatures.iter().flatten().filter_map(|s| s.base_type()) {
                    match base {
                        None => base = Some(bt),
                        Some(expected) if expected != bt => {
                            self.report.error(
                                DiagnosticKind::SignatureMismatch,
                                path,
                                format!("{} mixes base types {expected} and {bt}", op.name()),
                            );
                            return None;
                        }
                        Some(_) => {}
                    }
                }
                let cardinality = if op == NaryOp::Multiple {
                    Cardinality::Multiple
                } else {
                    Cardinality::Ordered
                };
                base.and_then(|bt| Signature::new(cardinality, Some(bt)))
            }
        }
    }

    fn binary_result(
        &mut self,
        op: BinaryOp,
        left: Option<Signature>,
        right: Option<Signature>,
        path: &NodePath,
    ) -> Option<Signature> {
        if let (Some(l), Some(r)) = (left, right) {
            if op.requires_same_cardinality() && l.cardinality() != r.cardinality() {
                self.report.error(
                    DiagnosticKind::SignatureMismatch,
                    path,
                    format!("{} operands differ: {l} and {r}", op.name()),
                );
            } else if op.requires_same_base_type() && l.base_type() != r.base_type() {
                self.report.error(
                    DiagnosticKind::SignatureMismatch,
                    path,
                    format!("{} operands differ in base type: {l} and {r}", op.name()),
                );
            }
        }
        match op {
            BinaryOp::Subtract => numeric_result(&[left, right]),
            BinaryOp::Divide => Some(Signature::Single(BaseType::Float)),
            BinaryOp::Lt
            | BinaryOp::Lte
            | BinaryOp::Gt
            | BinaryOp::Gte
            | BinaryOp::Equal
            | BinaryOp::Match
            | BinaryOp::Member
            | BinaryOp::Contains
            | BinaryOp::DurationLt
            | BinaryOp::DurationGte => Some(Signature::Single(BaseType::Boolean)),
        }
    }
}

/// Integer when every operand is known to be integer, float when any is
/// float or duration, unknown otherwise.
fn numeric_result(signatures: &[Option<Signature>]) -> Option<Signature> {
    let mut all_integer = true;
    for signature in signatures.iter().copied() {
        match signature.and_then(Signature::base_type) {
            Some(BaseType::Integer) => {}
            Some(BaseType::Float | BaseType::Duration) => {
                return Some(Signature::Single(BaseType::Float));
            }
            _ => all_integer = false,
        }
    }
    all_integer.then_some(Signature::Single(BaseType::Integer))
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}
