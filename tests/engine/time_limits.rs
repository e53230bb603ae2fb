//! Integration tests for time limits
//!
//! The effective limit of an item is the tightest bound over the item and
//! its ancestors.

use std::sync::Arc;

use proptest::prelude::*;
use qtiflow_engine::{EngineConfig, ItemFlow};
use qtiflow_foundation::Value;
use qtiflow_language::{AssessmentItem, NavigationMode, SubmissionMode, TestBuilder};

fn item() -> Arc<AssessmentItem> {
    AssessmentItem::new("q").shared()
}

fn nested(section: Option<f64>, item_limit: Option<f64>) -> ItemFlow {
    let mut builder = TestBuilder::new("T")
        .test_part("P", NavigationMode::Linear, SubmissionMode::Individual)
        .section("S");
    if let Some(limit) = section {
        builder = builder.time_limit(limit);
    }
    builder = builder.item_ref("I1", item());
    if let Some(limit) = item_limit {
        builder = builder.time_limit(limit);
    }
    let test = builder.item_ref("I2", item()).end().end().build().unwrap();
    let mut flow = ItemFlow::new(Arc::new(test), EngineConfig::default()).unwrap();
    flow.enter().unwrap();
    flow
}

#[test]
fn section_of_sixty_and_item_of_ninety() {
    let mut flow = nested(Some(60.0), Some(90.0));
    assert_eq!(flow.remaining_time(), Some(60.0));
    flow.elapse(45.0).unwrap();
    assert!(flow.submit_enabled());
    flow.elapse(15.0).unwrap();
    assert_eq!(flow.remaining_time(), Some(0.0));
    assert!(!flow.submit_enabled());
}

#[test]
fn no_limit_means_no_remaining_time() {
    let mut flow = nested(None, None);
    flow.elapse(10_000.0).unwrap();
    assert_eq!(flow.remaining_time(), None);
    assert!(flow.submit_enabled());
}

#[test]
fn section_time_carries_across_items() {
    let mut flow = nested(Some(60.0), None);
    flow.elapse(40.0).unwrap();
    flow.finish_item().unwrap();
    flow.advance().unwrap();
    assert_eq!(flow.remaining_time(), Some(20.0));
    flow.elapse(5.0).unwrap();
    assert_eq!(flow.value(&"I2.duration".into()).unwrap(), Value::duration(5.0));
    assert_eq!(flow.value(&"duration".into()).unwrap(), Value::duration(45.0));
}

#[test]
fn expired_item_cannot_be_submitted() {
    let mut flow = nested(None, Some(30.0));
    flow.elapse(31.0).unwrap();
    assert!(flow.finish_item().is_err());
    assert!(!flow.node_state(flow.current_item().unwrap()).finished);
}

#[test]
fn negative_and_nan_durations_are_rejected() {
    let mut flow = nested(Some(60.0), None);
    assert!(flow.elapse(-1.0).is_err());
    assert!(flow.elapse(f64::NAN).is_err());
    assert_eq!(flow.remaining_time(), Some(60.0));
}

proptest! {
    #[test]
    fn remaining_time_is_the_minimum_bound(
        section in 1u32..500,
        item_limit in 1u32..500,
        spent in 0u32..500,
    ) {
        let mut flow = nested(Some(f64::from(section)), Some(f64::from(item_limit)));
        flow.elapse(f64::from(spent)).unwrap();
        let expected = f64::from(section.min(item_limit)) - f64::from(spent);
        prop_assert_eq!(flow.remaining_time(), Some(expected));
        prop_assert_eq!(flow.submit_enabled(), expected > 0.0);
    }
}
