//! Integration tests for rule processing
//!
//! Conditional short-circuit, early-exit propagation, runtime-invalid rules,
//! and lookup-table assignment.

use std::sync::Arc;

use proptest::prelude::*;
use qtiflow_declaration::{Declarations, LookupTable, VariableDeclaration};
use qtiflow_engine::{
    ExitSignal, ItemSessionContext, ProcessingContext, RuleProcessor, evaluate,
};
use qtiflow_foundation::{BaseType, Cardinality, Signature, SingleValue, Value};
use qtiflow_language::{ConditionRule, Expression, ProcessingKind, ProcessingTree, Rule};

fn context() -> ItemSessionContext {
    let declarations = Declarations::item()
        .with(VariableDeclaration::response(
            "RESPONSE",
            Signature::Multiple(BaseType::Identifier),
        ))
        .with(VariableDeclaration::outcome(
            "BRANCH",
            Signature::Single(BaseType::Integer),
        ))
        .with(VariableDeclaration::outcome(
            "MARKER",
            Signature::Single(BaseType::Boolean),
        ))
        .with(
            VariableDeclaration::outcome("score", Signature::Single(BaseType::String))
                .with_lookup_table(
                    LookupTable::match_table()
                        .with_exact(1, "Low")
                        .with_range(2, 5, "Mid")
                        .with_default("High"),
                ),
        );
    ItemSessionContext::new(Arc::new(declarations), 0)
}

fn marker() -> Rule {
    Rule::set_outcome("MARKER", true.into())
}

fn branch(n: i64) -> Vec<Rule> {
    vec![Rule::set_outcome("BRANCH", Expression::base(n))]
}

fn guard(g: Option<bool>) -> Expression {
    g.map_or(Expression::Null, Expression::from)
}

// =============================================================================
// Conditional Short-Circuit
// =============================================================================

proptest! {
    #[test]
    fn first_true_branch_runs_alone(
        guards in prop::collection::vec(prop::option::of(any::<bool>()), 1..6),
        has_else in any::<bool>(),
    ) {
        let mut condition = ConditionRule::new(guard(guards[0]), branch(0));
        for (i, g) in guards.iter().enumerate().skip(1) {
            condition = condition.else_if(guard(*g), branch(i64::try_from(i).unwrap()));
        }
        if has_else {
            condition = condition.otherwise(branch(-1));
        }
        let tree = ProcessingTree::response(vec![Rule::Condition(condition)]);

        let mut ctx = context();
        let report = RuleProcessor::default().run(&tree, &mut ctx).unwrap();

        let expected = match guards.iter().position(|g| *g == Some(true)) {
            Some(i) => Value::integer(i64::try_from(i).unwrap()),
            None if has_else => Value::integer(-1),
            None => Value::Null,
        };
        prop_assert_eq!(ctx.get(&"BRANCH".into()), expected);
        prop_assert!(report.warnings.is_empty());
        let executed = 1 + usize::from(!ctx.get(&"BRANCH".into()).is_null());
        prop_assert_eq!(report.rules_executed, executed);
    }
}

// =============================================================================
// Early Exit
// =============================================================================

#[test]
fn exit_inside_nested_body_skips_everything_after_it() {
    let inner = ConditionRule::new(true.into(), vec![Rule::ExitResponse, marker()])
        .otherwise(vec![marker()]);
    let outer = ConditionRule::new(true.into(), vec![Rule::Condition(inner), marker()])
        .else_if(true.into(), vec![marker()])
        .otherwise(vec![marker()]);
    let tree = ProcessingTree::response(vec![Rule::Condition(outer), marker()]);

    let mut ctx = context();
    let report = RuleProcessor::default().run(&tree, &mut ctx).unwrap();

    assert_eq!(report.exited, Some(ExitSignal::Response));
    assert!(ctx.get(&"MARKER".into()).is_null());
    assert!(report.warnings.is_empty());
}

#[test]
fn exit_is_not_an_error_and_keeps_earlier_effects() {
    let tree = ProcessingTree::response(vec![
        Rule::set_outcome("BRANCH", Expression::base(7i64)),
        Rule::ExitResponse,
        Rule::set_outcome("BRANCH", Expression::base(8i64)),
    ]);
    let mut ctx = context();
    let report = RuleProcessor::default().run(&tree, &mut ctx).unwrap();
    assert_eq!(report.exited, Some(ExitSignal::Response));
    assert_eq!(ctx.get(&"BRANCH".into()), Value::integer(7));
}

// =============================================================================
// Runtime-Invalid Rules
// =============================================================================

#[test]
fn invalid_assignment_is_discarded_and_processing_continues() {
    let mut ctx = context();
    ctx.set_value(&"BRANCH".into(), Value::integer(1)).unwrap();
    let tree = ProcessingTree::response(vec![
        Rule::set_outcome("BRANCH", Expression::base("not a number")),
        Rule::set_outcome("BRANCH", Expression::variable("UNDECLARED")),
        marker(),
    ]);
    let report = RuleProcessor::default().run(&tree, &mut ctx).unwrap();
    assert_eq!(ctx.get(&"BRANCH".into()), Value::integer(1));
    assert_eq!(ctx.get(&"MARKER".into()), Value::boolean(true));
    assert_eq!(report.warnings.len(), 2);
}

#[test]
fn unresolved_template_is_fatal_and_leaves_state_intact() {
    let mut ctx = context();
    ctx.set_value(&"BRANCH".into(), Value::integer(3)).unwrap();
    let tree = ProcessingTree::from_template(ProcessingKind::Response, "urn:missing");
    let err = RuleProcessor::default().run(&tree, &mut ctx).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(ctx.get(&"BRANCH".into()), Value::integer(3));
}

// =============================================================================
// Lookup Scenario
// =============================================================================

#[test]
fn lookup_outcome_value_scenario() {
    let mut ctx = context();
    let processor = RuleProcessor::default();
    let lookup = |input: Expression| {
        ProcessingTree::response(vec![Rule::lookup_outcome("score", input)])
    };

    processor.run(&lookup(Expression::base(2i64)), &mut ctx).unwrap();
    assert_eq!(ctx.get(&"score".into()), Value::string("Mid"));

    processor.run(&lookup(Expression::base(9i64)), &mut ctx).unwrap();
    assert_eq!(ctx.get(&"score".into()), Value::string("High"));

    let report = processor.run(&lookup(Expression::Null), &mut ctx).unwrap();
    assert_eq!(ctx.get(&"score".into()), Value::string("High"));
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn lookup_accepts_durations() {
    let mut ctx = context();
    let tree = ProcessingTree::response(vec![Rule::lookup_outcome(
        "score",
        Expression::base(SingleValue::Duration(1.0)),
    )]);
    RuleProcessor::default().run(&tree, &mut ctx).unwrap();
    assert_eq!(ctx.get(&"score".into()), Value::string("Low"));
}

// =============================================================================
// Expressions
// =============================================================================

#[test]
fn null_response_propagates() {
    let mut ctx = context();
    let size = evaluate(
        &Expression::unary(qtiflow_language::UnaryOp::ContainerSize, Expression::variable("RESPONSE")),
        &mut ctx,
    )
    .unwrap();
    assert_eq!(size, Value::integer(0));

    let sum = evaluate(
        &Expression::sum(vec![Expression::base(1i64), Expression::Null]),
        &mut ctx,
    )
    .unwrap();
    assert!(sum.is_null());
}

#[test]
fn match_compares_bags() {
    let mut ctx = context();
    let response = Value::from_singles(
        Cardinality::Multiple,
        vec![SingleValue::identifier("B"), SingleValue::identifier("A")],
    )
    .unwrap();
    ctx.set_value(&"RESPONSE".into(), response).unwrap();
    let expected = Expression::nary(
        qtiflow_language::NaryOp::Multiple,
        vec![
            Expression::base(SingleValue::identifier("A")),
            Expression::base(SingleValue::identifier("B")),
        ],
    );
    let result = evaluate(
        &Expression::matches(Expression::variable("RESPONSE"), expected),
        &mut ctx,
    )
    .unwrap();
    assert_eq!(result, Value::boolean(true));
}
