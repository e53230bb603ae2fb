//! Integration tests for static validation
//!
//! Validation collects every diagnostic of an item or test, addressed by
//! node path, and never stops at the first error.

use std::sync::Arc;

use qtiflow_declaration::{LookupTable, Mapping, VariableDeclaration};
use qtiflow_foundation::{BaseType, Signature, SingleValue};
use qtiflow_language::{
    AssessmentItem, ConditionRule, DiagnosticKind, Expression, MAP_RESPONSE, NavigationMode,
    ProcessingKind, ProcessingTree, Rule, Severity, SubmissionMode, TemplateLibrary, TestBuilder,
    Validator,
};

fn validator_templates() -> TemplateLibrary {
    TemplateLibrary::standard()
}

fn choice_item() -> AssessmentItem {
    AssessmentItem::new("choice")
        .with_declaration(
            VariableDeclaration::response("RESPONSE", Signature::Single(BaseType::Identifier))
                .with_correct_response(SingleValue::identifier("A"))
                .with_mapping(Mapping::new().with_entry(SingleValue::identifier("A"), 1.0)),
        )
        .with_declaration(VariableDeclaration::outcome(
            "SCORE",
            Signature::Single(BaseType::Float),
        ))
}

// =============================================================================
// Items
// =============================================================================

#[test]
fn standard_templates_validate() {
    let templates = validator_templates();
    let item = choice_item()
        .with_response_processing(ProcessingTree::from_template(ProcessingKind::Response, MAP_RESPONSE));
    let report = Validator::new(&templates).validate_item(&item);
    assert!(report.is_empty(), "{report:?}");
}

#[test]
fn every_error_is_reported() {
    let templates = validator_templates();
    let item = choice_item()
        .with_declaration(VariableDeclaration::outcome(
            "duration",
            Signature::Single(BaseType::Float),
        ))
        .with_response_processing(ProcessingTree::response(vec![
            Rule::set_outcome("SCORE", Expression::base("text")),
            Rule::Condition(ConditionRule::new(
                Expression::variable("MISSING"),
                vec![Rule::lookup_outcome("SCORE", Expression::base(1i64))],
            )),
            Rule::set_outcome("NOWHERE", Expression::base(1.0)),
        ]));
    let report = Validator::new(&templates).validate_item(&item);

    assert!(report.has(DiagnosticKind::ReservedIdentifier));
    assert!(report.has(DiagnosticKind::SignatureMismatch));
    assert!(report.has(DiagnosticKind::MissingLookupTable));
    assert!(report.has(DiagnosticKind::UnresolvedReference));
    assert!(report.error_count() >= 5);
    assert!(report.iter().all(|d| d.severity == Severity::Error));
}

#[test]
fn mismatch_message_names_expected_and_found() {
    let templates = validator_templates();
    let item = choice_item().with_response_processing(ProcessingTree::response(vec![
        Rule::set_outcome("SCORE", Expression::base("text")),
    ]));
    let report = Validator::new(&templates).validate_item(&item);
    let d = report.errors().next().unwrap();
    assert!(d.message.contains("single float"), "{}", d.message);
    assert!(d.message.contains("single string"), "{}", d.message);
    assert!(d.path.to_string().contains("setOutcomeValue[SCORE]"));
}

#[test]
fn missing_mapping_is_an_error() {
    let templates = validator_templates();
    let item = AssessmentItem::new("q")
        .with_declaration(VariableDeclaration::response(
            "RESPONSE",
            Signature::Single(BaseType::Identifier),
        ))
        .with_declaration(VariableDeclaration::outcome(
            "SCORE",
            Signature::Single(BaseType::Float),
        ))
        .with_response_processing(ProcessingTree::response(vec![Rule::set_outcome(
            "SCORE",
            Expression::map_response("RESPONSE"),
        )]));
    let report = Validator::new(&templates).validate_item(&item);
    assert!(report.has(DiagnosticKind::MissingMapping));
}

#[test]
fn lookup_table_targets_must_fit() {
    let templates = validator_templates();
    let item = AssessmentItem::new("q").with_declaration(
        VariableDeclaration::outcome("GRADE", Signature::Single(BaseType::Integer)).with_lookup_table(
            LookupTable::match_table()
                .with_exact(1, "Low")
                .with_default(3i64),
        ),
    );
    let report = Validator::new(&templates).validate_item(&item);
    assert_eq!(report.error_count(), 1);
    assert!(report.has(DiagnosticKind::SignatureMismatch));
}

#[test]
fn unresolved_template_does_not_stop_validation() {
    let templates = validator_templates();
    let item = choice_item()
        .with_declaration(VariableDeclaration::outcome(
            "numAttempts",
            Signature::Single(BaseType::Integer),
        ))
        .with_response_processing(ProcessingTree::from_template(
            ProcessingKind::Response,
            "urn:unknown-template",
        ));
    let report = Validator::new(&templates).validate_item(&item);
    assert!(report.has(DiagnosticKind::UnresolvedTemplate));
    assert!(report.has(DiagnosticKind::ReservedIdentifier));
}

#[test]
fn empty_bodies_are_warnings() {
    let templates = validator_templates();
    let item = choice_item().with_response_processing(ProcessingTree::response(vec![
        Rule::Condition(ConditionRule::new(true.into(), Vec::new())),
    ]));
    let report = Validator::new(&templates).validate_item(&item);
    assert!(report.is_valid());
    assert_eq!(report.warning_count(), 1);
    assert!(report.has(DiagnosticKind::EmptyBody));
}

#[test]
fn exit_rules_belong_to_their_processing() {
    let templates = validator_templates();
    let item = choice_item()
        .with_response_processing(ProcessingTree::response(vec![Rule::ExitTest]));
    let report = Validator::new(&templates).validate_item(&item);
    assert!(report.has(DiagnosticKind::MisplacedRule));
}

#[test]
fn response_processing_may_set_a_response() {
    let templates = validator_templates();
    let item = choice_item().with_response_processing(ProcessingTree::response(vec![
        Rule::set_response("RESPONSE", Expression::base(SingleValue::identifier("A"))),
    ]));
    let report = Validator::new(&templates).validate_item(&item);
    assert!(report.is_empty(), "{report:?}");
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_level_structure_errors() {
    let templates = validator_templates();
    let item = choice_item().shared();
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .section("S")
        .time_limit(-1.0)
        .item_ref("Q1", Arc::clone(&item))
        .variable_mapping("POINTS", "GONE")
        .item_ref("Q1", item)
        .unresolved_item_ref("Q2")
        .end()
        .end()
        .build()
        .unwrap();
    let report = Validator::new(&templates).validate_test(&test);
    assert!(report.has(DiagnosticKind::InvalidAttribute));
    assert!(report.has(DiagnosticKind::DuplicateIdentifier));
    assert_eq!(
        report
            .errors()
            .filter(|d| d.kind == DiagnosticKind::UnresolvedReference)
            .count(),
        2
    );
}

#[test]
fn navigation_rules_outside_linear_individual_parts_warn() {
    let templates = validator_templates();
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Nonlinear, SubmissionMode::Individual)
        .item_ref("Q1", choice_item().shared())
        .precondition(true.into())
        .branch_rule("EXIT_TEST", true.into())
        .end()
        .build()
        .unwrap();
    let report = Validator::new(&templates).validate_test(&test);
    assert!(report.is_valid());
    assert_eq!(report.warning_count(), 2);
    assert!(report.has(DiagnosticKind::IgnoredNavigationRule));
}

#[test]
fn outcome_processing_reads_items_through_mappings() {
    let templates = validator_templates();
    let test = TestBuilder::new("T")
        .declare(VariableDeclaration::outcome(
            "TOTAL",
            Signature::Single(BaseType::Float),
        ))
        .outcome_processing(ProcessingTree::outcome(vec![Rule::set_outcome(
            "TOTAL",
            Expression::sum(vec![
                Expression::variable("Q1.POINTS"),
                Expression::variable("Q9.SCORE"),
            ]),
        )]))
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("Q1", choice_item().shared())
        .variable_mapping("POINTS", "SCORE")
        .end()
        .build()
        .unwrap();
    let report = Validator::new(&templates).validate_test(&test);
    assert_eq!(report.error_count(), 1, "{report:?}");
    let d = report.errors().next().unwrap();
    assert_eq!(d.kind, DiagnosticKind::UnresolvedReference);
    assert!(d.message.contains("Q9"));
}

#[test]
fn item_diagnostics_are_addressed_under_the_reference() {
    let templates = validator_templates();
    let item = choice_item()
        .with_response_processing(ProcessingTree::response(vec![Rule::set_outcome(
            "NOWHERE",
            Expression::base(1.0),
        )]))
        .shared();
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("Q1", item)
        .end()
        .build()
        .unwrap();
    let report = Validator::new(&templates).validate_test(&test);
    let d = report.errors().next().unwrap();
    let path = d.path.to_string();
    assert!(path.contains("assessmentItemRef[Q1]"), "{path}");
    assert!(path.contains("setOutcomeValue[NOWHERE]"), "{path}");
}
