//! Integration tests for item flow
//!
//! Branch targets, preconditions over item outcomes, exitTest from outcome
//! processing, candidate jumps, and atomicity of failed calls.

use std::sync::Arc;

use qtiflow_declaration::VariableDeclaration;
use qtiflow_engine::{EngineConfig, ItemFlow, NodeStatus};
use qtiflow_foundation::{BaseType, ErrorKind, Signature, Value};
use qtiflow_language::{
    AssessmentItem, AssessmentTest, ConditionRule, Expression, ItemSessionControl,
    NavigationMode, NodeId, ProcessingKind, ProcessingTree, Rule, SubmissionMode, TestBuilder,
};

// =============================================================================
// Helpers
// =============================================================================

/// An item copying its integer RESPONSE into SCORE.
fn echo_item(id: &str) -> Arc<AssessmentItem> {
    AssessmentItem::new(id)
        .with_declaration(VariableDeclaration::response(
            "RESPONSE",
            Signature::Single(BaseType::Integer),
        ))
        .with_declaration(VariableDeclaration::outcome(
            "SCORE",
            Signature::Single(BaseType::Integer),
        ))
        .with_response_processing(ProcessingTree::response(vec![Rule::set_outcome(
            "SCORE",
            Expression::variable("RESPONSE"),
        )]))
        .shared()
}

fn start(test: AssessmentTest, config: EngineConfig) -> ItemFlow {
    let mut flow = ItemFlow::new(Arc::new(test), config).unwrap();
    flow.enter().unwrap();
    flow
}

fn current(flow: &ItemFlow) -> Option<String> {
    flow.current_item()
        .map(|id| flow.test().node(id).identifier.to_string())
}

fn node(flow: &ItemFlow, name: &str) -> NodeId {
    flow.test().find(&name.into()).unwrap()
}

fn answer(flow: &mut ItemFlow, response: i64) {
    flow.set_response("RESPONSE", Value::integer(response)).unwrap();
    flow.finish_item().unwrap();
}

// =============================================================================
// Branch Targets
// =============================================================================

#[test]
fn exit_testpart_moves_to_next_part() {
    let test = TestBuilder::new("T")
        .test_part("P1", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .branch_rule("EXIT_TESTPART", true.into())
        .item_ref("I2", echo_item("b"))
        .end()
        .test_part("P2", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I3", echo_item("c"))
        .end()
        .build()
        .unwrap();
    let mut flow = start(test, EngineConfig::default());

    answer(&mut flow, 1);
    flow.advance().unwrap();

    assert_eq!(current(&flow).as_deref(), Some("I3"));
    assert_eq!(flow.current_test_part(), Some(node(&flow, "P2")));
    assert!(flow.node_state(node(&flow, "I2")).skipped);
    assert_eq!(flow.node_state(node(&flow, "P1")).status(), NodeStatus::Finished);
}

#[test]
fn exit_section_resumes_after_the_section() {
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .section("S")
        .item_ref("I1", echo_item("a"))
        .branch_rule("EXIT_SECTION", true.into())
        .item_ref("I2", echo_item("b"))
        .end()
        .item_ref("I3", echo_item("c"))
        .end()
        .build()
        .unwrap();
    let mut flow = start(test, EngineConfig::default());

    answer(&mut flow, 1);
    flow.advance().unwrap();

    assert_eq!(current(&flow).as_deref(), Some("I3"));
    assert!(flow.node_state(node(&flow, "I2")).skipped);
    assert_eq!(flow.node_state(node(&flow, "S")).status(), NodeStatus::Finished);
}

#[test]
fn exit_test_branch_ends_the_session() {
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .branch_rule("EXIT_TEST", Expression::gte(
            Expression::variable("I1.SCORE"),
            Expression::base(5i64),
        ))
        .item_ref("I2", echo_item("b"))
        .end()
        .build()
        .unwrap();
    let mut flow = start(test, EngineConfig::default());

    answer(&mut flow, 7);
    flow.advance().unwrap();

    assert!(flow.is_finished());
    assert_eq!(flow.current_item(), None);
    assert!(flow.node_state(node(&flow, "I2")).skipped);
    assert!(flow.advance().is_err());
}

#[test]
fn first_true_branch_rule_wins() {
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .branch_rule("I3", false.into())
        .branch_rule("I4", true.into())
        .branch_rule("I3", true.into())
        .item_ref("I2", echo_item("b"))
        .item_ref("I3", echo_item("c"))
        .item_ref("I4", echo_item("d"))
        .end()
        .build()
        .unwrap();
    let mut flow = start(test, EngineConfig::default());

    answer(&mut flow, 0);
    flow.advance().unwrap();
    assert_eq!(current(&flow).as_deref(), Some("I4"));
    assert!(flow.node_state(node(&flow, "I3")).skipped);
}

#[test]
fn non_boolean_guard_is_false_with_a_warning() {
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .branch_rule("I3", Expression::base(1i64))
        .item_ref("I2", echo_item("b"))
        .item_ref("I3", echo_item("c"))
        .end()
        .build()
        .unwrap();
    let mut flow = start(test, EngineConfig::trusted());

    answer(&mut flow, 0);
    flow.advance().unwrap();
    assert_eq!(current(&flow).as_deref(), Some("I2"));
    assert_eq!(flow.warnings().len(), 1);
}

// =============================================================================
// Preconditions
// =============================================================================

fn gated() -> AssessmentTest {
    TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .item_ref("I2", echo_item("b"))
        .precondition(Expression::gte(
            Expression::variable("I1.SCORE"),
            Expression::base(1i64),
        ))
        .item_ref("I3", echo_item("c"))
        .end()
        .build()
        .unwrap()
}

#[test]
fn precondition_reads_earlier_outcomes() {
    let mut passed = start(gated(), EngineConfig::default());
    answer(&mut passed, 1);
    passed.advance().unwrap();
    assert_eq!(current(&passed).as_deref(), Some("I2"));

    let mut failed = start(gated(), EngineConfig::default());
    answer(&mut failed, 0);
    failed.advance().unwrap();
    assert_eq!(current(&failed).as_deref(), Some("I3"));
    let skipped = failed.node_state(node(&failed, "I2"));
    assert!(skipped.skipped);
    assert_eq!(skipped.status(), NodeStatus::NotEntered);
}

#[test]
fn null_precondition_skips_without_warning() {
    let mut flow = start(gated(), EngineConfig::default());
    flow.finish_item().unwrap();
    flow.advance().unwrap();
    assert_eq!(current(&flow).as_deref(), Some("I3"));
    assert!(flow.warnings().is_empty());
}

// =============================================================================
// Outcome Processing
// =============================================================================

#[test]
fn exit_test_in_outcome_processing_ends_the_flow() {
    let test = TestBuilder::new("T")
        .declare(VariableDeclaration::outcome(
            "TOTAL",
            Signature::Single(BaseType::Integer),
        ))
        .outcome_processing(ProcessingTree::outcome(vec![
            Rule::set_outcome("TOTAL", Expression::variable("I1.SCORE")),
            Rule::Condition(ConditionRule::new(
                Expression::gte(Expression::variable("TOTAL"), Expression::base(10i64)),
                vec![Rule::ExitTest],
            )),
        ]))
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .item_ref("I2", echo_item("b"))
        .end()
        .build()
        .unwrap();

    let mut low = start(test.clone(), EngineConfig::default());
    answer(&mut low, 3);
    assert!(!low.is_finished());
    assert_eq!(low.value(&"TOTAL".into()).unwrap(), Value::integer(3));

    let mut high = start(test, EngineConfig::default());
    answer(&mut high, 12);
    assert!(high.is_finished());
    assert_eq!(high.value(&"TOTAL".into()).unwrap(), Value::integer(12));
    assert!(!high.node_state(node(&high, "I2")).presented);
}

#[test]
fn unresolved_template_at_runtime_restores_the_session() {
    let item = AssessmentItem::new("broken")
        .with_declaration(VariableDeclaration::response(
            "RESPONSE",
            Signature::Single(BaseType::Integer),
        ))
        .with_response_processing(ProcessingTree::from_template(
            ProcessingKind::Response,
            "urn:example:missing",
        ))
        .shared();
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", item)
        .end()
        .build()
        .unwrap();

    assert!(ItemFlow::new(Arc::new(test.clone()), EngineConfig::default()).is_err());

    let mut flow = start(test, EngineConfig::trusted());
    flow.set_response("RESPONSE", Value::integer(4)).unwrap();
    let attempts = flow.value(&"I1.numAttempts".into()).unwrap();

    let err = flow.finish_item().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnresolvedTemplate(_)));
    assert!(!flow.node_state(node(&flow, "I1")).finished);
    assert_eq!(flow.value(&"I1.numAttempts".into()).unwrap(), attempts);
    assert_eq!(flow.value(&"I1.RESPONSE".into()).unwrap(), Value::integer(4));
    assert!(flow.submit_enabled());
}

#[test]
fn response_processing_may_fill_in_a_response() {
    let item = AssessmentItem::new("defaulted")
        .with_declaration(VariableDeclaration::response(
            "RESPONSE",
            Signature::Single(BaseType::Integer),
        ))
        .with_response_processing(ProcessingTree::response(vec![Rule::Condition(
            ConditionRule::new(
                Expression::is_null(Expression::variable("RESPONSE")),
                vec![Rule::set_response("RESPONSE", Expression::base(0i64))],
            ),
        )]))
        .shared();
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", item)
        .end()
        .build()
        .unwrap();

    let mut flow = start(test, EngineConfig::default());
    flow.finish_item().unwrap();
    assert_eq!(flow.value(&"I1.RESPONSE".into()).unwrap(), Value::integer(0));
    assert!(flow.warnings().is_empty());
}

// =============================================================================
// Candidate Jumps
// =============================================================================

fn three_items() -> AssessmentTest {
    TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .item_ref("I2", echo_item("b"))
        .item_ref("I3", echo_item("c"))
        .end()
        .build()
        .unwrap()
}

#[test]
fn jump_to_needs_a_finished_item() {
    let mut flow = start(three_items(), EngineConfig::default());
    assert!(flow.jump_to("I3").is_err());
    assert_eq!(current(&flow).as_deref(), Some("I1"));
}

#[test]
fn jump_to_moves_forward_and_refuses_backward() {
    let mut flow = start(three_items(), EngineConfig::default());
    answer(&mut flow, 1);
    flow.jump_to("I3").unwrap();
    assert_eq!(current(&flow).as_deref(), Some("I3"));
    assert!(flow.node_state(node(&flow, "I2")).skipped);

    answer(&mut flow, 1);
    let err = flow.jump_to("I1").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IllegalJump { .. }));
    assert_eq!(current(&flow).as_deref(), Some("I3"));
    assert!(!flow.is_finished());

    flow.jump_to("EXIT_TEST").unwrap();
    assert!(flow.is_finished());
}

fn jump_into_guarded_section(open: bool) -> AssessmentTest {
    TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .branch_rule("I3", true.into())
        .section("S1")
        .item_ref("I2", echo_item("b"))
        .end()
        .section("S2")
        .precondition(open.into())
        .item_ref("I3", echo_item("c"))
        .end()
        .item_ref("I4", echo_item("d"))
        .end()
        .build()
        .unwrap()
}

#[test]
fn jump_target_sections_are_entered() {
    let mut flow = start(jump_into_guarded_section(true), EngineConfig::default());
    answer(&mut flow, 1);
    flow.advance().unwrap();

    assert_eq!(current(&flow).as_deref(), Some("I3"));
    let section = flow.node_state(node(&flow, "S2"));
    assert!(!section.skipped);
    assert_eq!(section.status(), NodeStatus::Presented);
    assert!(flow.node_state(node(&flow, "S1")).skipped);
    assert!(flow.node_state(node(&flow, "I2")).skipped);

    answer(&mut flow, 1);
    flow.advance().unwrap();
    assert_eq!(current(&flow).as_deref(), Some("I4"));
    assert_eq!(flow.node_state(node(&flow, "S2")).status(), NodeStatus::Finished);
}

#[test]
fn jump_target_section_preconditions_apply() {
    let mut flow = start(jump_into_guarded_section(false), EngineConfig::default());
    answer(&mut flow, 1);
    flow.advance().unwrap();

    assert_eq!(current(&flow).as_deref(), Some("I4"));
    let section = flow.node_state(node(&flow, "S2"));
    assert!(section.skipped);
    assert_eq!(section.status(), NodeStatus::NotEntered);
    let target = flow.node_state(node(&flow, "I3"));
    assert!(target.skipped);
    assert!(!target.presented);
}

#[test]
fn jump_to_is_refused_in_nonlinear_parts() {
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Nonlinear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .item_ref("I2", echo_item("b"))
        .end()
        .build()
        .unwrap();
    let mut flow = start(test, EngineConfig::default());
    answer(&mut flow, 1);
    assert!(flow.jump_to("I2").is_err());
}

// =============================================================================
// Session Rules
// =============================================================================

#[test]
fn calls_before_enter_fail() {
    let mut flow = ItemFlow::new(Arc::new(three_items()), EngineConfig::default()).unwrap();
    assert!(flow.advance().is_err());
    assert!(flow.finish_item().is_err());
    assert!(flow.elapse(1.0).is_err());
    assert_eq!(flow.current_item(), None);
}

#[test]
fn skipping_follows_session_control() {
    let test = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .item_ref("I2", echo_item("b"))
        .session_control(ItemSessionControl {
            allow_skipping: false,
            allow_review: true,
        })
        .end()
        .build()
        .unwrap();
    let mut flow = start(test, EngineConfig::default());

    flow.skip_item().unwrap();
    let skipped = flow.node_state(node(&flow, "I1"));
    assert!(skipped.skipped);
    assert_eq!(skipped.status(), NodeStatus::Finished);
    assert!(flow.value(&"I1.SCORE".into()).unwrap().is_null());

    flow.advance().unwrap();
    assert!(flow.skip_item().is_err());
    assert_eq!(current(&flow).as_deref(), Some("I2"));
}

#[test]
fn linear_parts_refuse_leaving_unfinished_items() {
    let mut flow = start(three_items(), EngineConfig::default());
    assert!(flow.end_test_part().is_err());
    assert_eq!(current(&flow).as_deref(), Some("I1"));
    flow.finish_item().unwrap();
    flow.end_test_part().unwrap();
    assert!(flow.is_finished());
    assert!(!flow.node_state(node(&flow, "I2")).presented);
}

#[test]
fn nonlinear_part_hands_over_to_the_next_part() {
    let test = TestBuilder::new("T")
        .test_part("P1", NavigationMode::Nonlinear, SubmissionMode::Individual)
        .item_ref("I1", echo_item("a"))
        .item_ref("I2", echo_item("b"))
        .end()
        .test_part("P2", NavigationMode::Linear, SubmissionMode::Individual)
        .item_ref("I3", echo_item("c"))
        .end()
        .build()
        .unwrap();
    let mut flow = start(test, EngineConfig::default());

    flow.select_item(&"I2".into()).unwrap();
    answer(&mut flow, 2);
    assert!(flow.select_item(&"I3".into()).is_err());

    flow.end_test_part().unwrap();
    assert_eq!(current(&flow).as_deref(), Some("I3"));
    assert_eq!(flow.current_test_part(), Some(node(&flow, "P2")));
    assert_eq!(flow.value(&"I2.SCORE".into()).unwrap(), Value::integer(2));
}
