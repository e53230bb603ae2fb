//! Response/outcome processing, session contexts, and item flow for qtiflow.
//!
//! This crate provides:
//! - [`ItemSessionContext`] and [`TestSessionContext`] - Variable bindings with snapshot/restore
//! - [`evaluate`] - Expression evaluation with NULL propagation
//! - [`RuleProcessor`] - Response and outcome processing with early exit
//! - [`ItemFlow`] - Test navigation: preconditions, branch rules, submission, time limits
//! - [`EngineConfig`] - Session configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod evaluate;
pub mod flow;
pub mod processing;

pub use config::EngineConfig;
pub use context::{
    ItemSessionContext, ItemSnapshot, ProcessingContext, TestSessionContext, TestSnapshot,
};
pub use evaluate::evaluate;
pub use flow::{ItemFlow, NodeState, NodeStatus};
pub use processing::{
    Control, ExitSignal, ProcessingReport, RuleProcessor, RuntimeWarning,
};
