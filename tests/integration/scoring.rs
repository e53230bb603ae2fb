//! End-to-end scoring with the standard templates
//!
//! Items are scored by `match_correct` and `map_response`, and the test
//! totals them through qualified and mapped references.

use std::sync::Arc;

use qtiflow_declaration::{Mapping, VariableDeclaration};
use qtiflow_engine::{EngineConfig, ItemFlow, ItemSessionContext, ProcessingContext, RuleProcessor};
use qtiflow_foundation::{BaseType, Cardinality, Signature, SingleValue, Value};
use qtiflow_language::{
    AssessmentItem, AssessmentTest, Expression, MAP_RESPONSE, MATCH_CORRECT, NavigationMode,
    ProcessingKind, ProcessingTree, Rule, SubmissionMode, TemplateLibrary, TestBuilder, Validator,
};

// =============================================================================
// Fixtures
// =============================================================================

fn score() -> VariableDeclaration {
    VariableDeclaration::outcome("SCORE", Signature::Single(BaseType::Float)).with_default(0.0)
}

fn choice_item() -> Arc<AssessmentItem> {
    AssessmentItem::new("choice")
        .with_declaration(
            VariableDeclaration::response("RESPONSE", Signature::Single(BaseType::Identifier))
                .with_correct_response(Value::identifier("ChoiceA")),
        )
        .with_declaration(score())
        .with_response_processing(ProcessingTree::from_template(
            ProcessingKind::Response,
            MATCH_CORRECT,
        ))
        .shared()
}

fn multi_item() -> Arc<AssessmentItem> {
    let mapping = Mapping::new()
        .with_entry(SingleValue::identifier("A"), 2.0)
        .with_entry(SingleValue::identifier("B"), 1.0)
        .with_entry(SingleValue::identifier("C"), -1.0)
        .with_bounds(Some(0.0), Some(2.5));
    AssessmentItem::new("multi")
        .with_declaration(
            VariableDeclaration::response("RESPONSE", Signature::Multiple(BaseType::Identifier))
                .with_mapping(mapping),
        )
        .with_declaration(score())
        .with_response_processing(ProcessingTree::from_template(
            ProcessingKind::Response,
            MAP_RESPONSE,
        ))
        .shared()
}

fn choices(names: &[&str]) -> Value {
    Value::from_singles(
        Cardinality::Multiple,
        names.iter().map(|n| SingleValue::identifier(*n)).collect(),
    )
    .unwrap()
}

fn quiz() -> AssessmentTest {
    TestBuilder::new("quiz")
        .declare(
            VariableDeclaration::outcome("TOTAL", Signature::Single(BaseType::Float))
                .with_default(0.0),
        )
        .outcome_processing(ProcessingTree::outcome(vec![Rule::set_outcome(
            "TOTAL",
            Expression::sum(vec![
                Expression::variable("Q1.SCORE"),
                Expression::variable("Q2.POINTS"),
            ]),
        )]))
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .section("S")
        .item_ref("Q1", choice_item())
        .item_ref("Q2", multi_item())
        .variable_mapping("POINTS", "SCORE")
        .end()
        .end()
        .build()
        .unwrap()
}

// =============================================================================
// Templates
// =============================================================================

#[test]
fn standard_fixtures_validate_cleanly() {
    let templates = TemplateLibrary::standard();
    let validator = Validator::new(&templates);
    assert!(validator.validate_item(&choice_item()).is_valid());
    assert!(validator.validate_item(&multi_item()).is_valid());
    assert!(validator.validate_test(&quiz()).is_valid());
}

#[test]
fn match_correct_scores_one_or_zero() {
    let processor = RuleProcessor::default();
    let item = choice_item();

    for (answer, expected) in [("ChoiceA", 1.0), ("ChoiceB", 0.0)] {
        let mut ctx = ItemSessionContext::for_item(&item, 0);
        ctx.set_value(&"RESPONSE".into(), Value::identifier(answer))
            .unwrap();
        processor.process_responses(&item, &mut ctx).unwrap();
        assert_eq!(ctx.get(&"SCORE".into()), Value::float(expected));
    }
}

#[test]
fn map_response_sums_and_clamps() {
    let processor = RuleProcessor::default();
    let item = multi_item();
    let cases = [
        (choices(&["A", "C"]), 1.0),
        (choices(&["A", "A", "B"]), 2.5),
        (choices(&["C"]), 0.0),
        (Value::Null, 0.0),
    ];

    for (response, expected) in cases {
        let mut ctx = ItemSessionContext::for_item(&item, 0);
        ctx.set_value(&"RESPONSE".into(), response).unwrap();
        processor.process_responses(&item, &mut ctx).unwrap();
        assert_eq!(ctx.get(&"SCORE".into()), Value::float(expected));
    }
}

#[test]
fn response_processing_updates_builtins() {
    let processor = RuleProcessor::default();
    let item = choice_item();
    let mut ctx = ItemSessionContext::for_item(&item, 0);
    assert_eq!(
        ctx.get(&"completionStatus".into()),
        Value::identifier("not_attempted")
    );

    processor.process_responses(&item, &mut ctx).unwrap();
    processor.process_responses(&item, &mut ctx).unwrap();
    assert_eq!(ctx.get(&"numAttempts".into()), Value::integer(2));
    assert_eq!(
        ctx.get(&"completionStatus".into()),
        Value::identifier("completed")
    );
}

// =============================================================================
// Test Totals
// =============================================================================

#[test]
fn totals_follow_each_submission() {
    let mut flow = ItemFlow::new(Arc::new(quiz()), EngineConfig::default()).unwrap();
    flow.enter().unwrap();

    flow.set_response("RESPONSE", Value::identifier("ChoiceA"))
        .unwrap();
    flow.finish_item().unwrap();
    assert_eq!(flow.value(&"TOTAL".into()).unwrap(), Value::float(1.0));

    flow.advance().unwrap();
    flow.set_response("RESPONSE", choices(&["A", "B"])).unwrap();
    flow.finish_item().unwrap();
    assert_eq!(flow.value(&"Q2.POINTS".into()).unwrap(), Value::float(2.5));
    assert_eq!(flow.value(&"TOTAL".into()).unwrap(), Value::float(3.5));

    flow.advance().unwrap();
    assert!(flow.is_finished());
    assert!(flow.warnings().is_empty());
}

#[test]
fn wrong_answers_total_zero() {
    let mut flow = ItemFlow::new(Arc::new(quiz()), EngineConfig::default()).unwrap();
    flow.enter().unwrap();
    flow.set_response("RESPONSE", Value::identifier("ChoiceC"))
        .unwrap();
    flow.finish_item().unwrap();
    flow.advance().unwrap();
    flow.set_response("RESPONSE", choices(&["C"])).unwrap();
    flow.finish_item().unwrap();
    assert_eq!(flow.value(&"TOTAL".into()).unwrap(), Value::float(0.0));
}

#[test]
fn response_of_the_wrong_cardinality_is_refused() {
    let mut flow = ItemFlow::new(Arc::new(quiz()), EngineConfig::default()).unwrap();
    flow.enter().unwrap();
    assert!(flow.set_response("RESPONSE", choices(&["ChoiceA"])).is_err());
    assert!(flow.value(&"Q1.RESPONSE".into()).unwrap().is_null());
}
