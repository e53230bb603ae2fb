//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, Signature, Identifier, and Error.
