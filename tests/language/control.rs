//! Integration tests for the control-object tree

use std::sync::Arc;

use qtiflow_declaration::{Scope, VariableDeclaration};
use qtiflow_foundation::{BaseType, ErrorKind, Signature, VariableRef};
use qtiflow_language::{
    AssessmentItem, AssessmentTest, ItemSessionControl, NavigationMode, SubmissionMode,
    TestBuilder,
};

fn item(id: &str) -> Arc<AssessmentItem> {
    AssessmentItem::new(id)
        .with_declaration(VariableDeclaration::outcome(
            "SCORE",
            Signature::Single(BaseType::Float),
        ))
        .shared()
}

fn two_parts() -> AssessmentTest {
    TestBuilder::new("T")
        .test_part("P1", NavigationMode::Linear, SubmissionMode::Individual)
        .section("S1")
        .item_ref("I1", item("a"))
        .item_ref("I2", item("b"))
        .end()
        .end()
        .test_part("P2", NavigationMode::Nonlinear, SubmissionMode::Simultaneous)
        .item_ref("I3", item("c"))
        .session_control(ItemSessionControl {
            allow_skipping: false,
            allow_review: true,
        })
        .end()
        .build()
        .unwrap()
}

// =============================================================================
// Structure
// =============================================================================

#[test]
fn arena_in_document_order() {
    let test = two_parts();
    let names: Vec<_> = test.nodes().map(|(_, n)| n.identifier.to_string()).collect();
    assert_eq!(names, vec!["T", "P1", "S1", "I1", "I2", "P2", "I3"]);
    assert_eq!(test.len(), 7);
    assert_eq!(test.test_parts().len(), 2);
}

#[test]
fn parents_and_ancestors() {
    let test = two_parts();
    let id = |n: &str| test.find(&n.into()).unwrap();
    assert_eq!(test.parent(id("I1")), Some(id("S1")));
    assert_eq!(test.ancestors(id("I1")), vec![id("S1"), id("P1"), test.root()]);
    assert_eq!(test.test_part_of(id("I2")), Some(id("P1")));
    assert_eq!(test.test_part_of(id("P2")), Some(id("P2")));
    assert_eq!(test.test_part_of(test.root()), None);
}

#[test]
fn item_refs_per_container() {
    let test = two_parts();
    let id = |n: &str| test.find(&n.into()).unwrap();
    assert_eq!(test.item_refs_in(id("P1")), vec![id("I1"), id("I2")]);
    assert_eq!(test.item_refs_in(id("P2")), vec![id("I3")]);
    assert_eq!(test.item_refs().count(), 3);
}

#[test]
fn jumps_only_in_linear_individual_parts() {
    let test = two_parts();
    let id = |n: &str| test.find(&n.into()).unwrap();
    assert!(test.jumps_enabled(id("I1")));
    assert!(test.jumps_enabled(id("P1")));
    assert!(!test.jumps_enabled(id("I3")));
    assert!(!test.jumps_enabled(test.root()));
}

#[test]
fn session_control_and_modes() {
    let test = two_parts();
    let id = |n: &str| test.find(&n.into()).unwrap();
    let control = test.node(id("I3")).session_control().unwrap();
    assert!(!control.allow_skipping);
    assert_eq!(
        test.node(id("I1")).session_control(),
        Some(ItemSessionControl::default())
    );
    assert_eq!(
        test.node(id("P2")).part_modes(),
        Some((NavigationMode::Nonlinear, SubmissionMode::Simultaneous))
    );
    assert_eq!(test.node(id("S1")).part_modes(), None);
}

#[test]
fn node_paths() {
    let test = two_parts();
    let i2 = test.find(&"I2".into()).unwrap();
    assert_eq!(
        test.path(i2).to_string(),
        "assessmentTest[T]/testPart[P1]/assessmentSection[S1]/assessmentItemRef[I2]"
    );
}

#[test]
fn test_scope_sees_every_item() {
    let test = two_parts();
    let scope = test.scope();
    assert!(scope.resolve(&VariableRef::qualified("I3", "SCORE")).is_ok());
    assert!(scope.resolve(&"duration".into()).is_ok());
}

// =============================================================================
// Builder Errors
// =============================================================================

#[test]
fn items_cannot_sit_at_the_root() {
    let err = TestBuilder::new("T").item_ref("I1", item("a")).build().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidStructure(_)));
}

#[test]
fn parts_cannot_nest() {
    let err = TestBuilder::new("T")
        .test_part("P1", NavigationMode::Linear, SubmissionMode::Individual)
        .test_part("P2", NavigationMode::Linear, SubmissionMode::Individual)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("P2"));
}

#[test]
fn unbalanced_end_is_an_error() {
    let err = TestBuilder::new("T").end().build().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidStructure(_)));
}

#[test]
fn item_attributes_on_sections_are_errors() {
    let err = TestBuilder::new("T")
        .test_part("P1", NavigationMode::Linear, SubmissionMode::Individual)
        .section("S1")
        .variable_mapping("A", "B")
        .build()
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidStructure(_)));
}
