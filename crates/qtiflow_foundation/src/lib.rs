//! Core types and values for qtiflow.
//!
//! This crate provides:
//! - [`Value`] - The value type for all session variables
//! - [`Signature`] - Cardinality and base type pairs with their matching rules
//! - [`Identifier`] and [`VariableRef`] - Names and (optionally qualified) references
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod identifier;
pub mod types;
pub mod value;

pub use error::{Error, ErrorContext, ErrorKind};
pub use identifier::{Identifier, VariableRef};
pub use types::{BaseType, Cardinality, Signature};
pub use value::{Container, Number, Record, SingleValue, Value};

/// Result type alias using the qtiflow error type.
pub type Result<T> = std::result::Result<T, Error>;
