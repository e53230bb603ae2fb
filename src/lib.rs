//! qtiflow - Assessment processing engine
//!
//! This crate re-exports all layers of the qtiflow system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: qtiflow_engine      - Session contexts, rule processing, item flow
//! Layer 2: qtiflow_language    - Expressions, rules, control tree, validation
//! Layer 1: qtiflow_declaration - Variable declarations, lookup tables, scopes
//! Layer 0: qtiflow_foundation  - Core types (Value, Signature, Error)
//! ```

pub use qtiflow_declaration as declaration;
pub use qtiflow_engine as engine;
pub use qtiflow_foundation as foundation;
pub use qtiflow_language as language;
