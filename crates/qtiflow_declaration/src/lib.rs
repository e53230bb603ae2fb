//! Variable declarations and scopes for qtiflow.
//!
//! This crate provides:
//! - [`VariableDeclaration`] and [`Declarations`] - Immutable variable declarations
//! - [`LookupTable`] - Match and interpolation tables for outcome lookups
//! - [`Mapping`] - Response-to-score mappings
//! - [`Scope`] - Resolution of local and item-qualified variable references

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod declaration;
pub mod lookup;
pub mod mapping;
pub mod scope;

pub use declaration::{
    COMPLETED, COMPLETION_STATUS, DURATION, Declarations, NOT_ATTEMPTED, NUM_ATTEMPTS,
    RESERVED_IDENTIFIERS, VariableDeclaration, VariableKind, is_reserved_identifier,
};
pub use lookup::{InterpolationEntry, LookupEntries, LookupTable, MatchEntry, MatchKey};
pub use mapping::{MapEntry, Mapping};
pub use scope::{ItemRefScope, Scope, TestScope, VariableMappings};
