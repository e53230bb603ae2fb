//! Configuration for processing and item flow.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for one test session.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Seed of the session's random generator.
    pub seed: u64,

    /// Validate the test before the flow is created.
    pub validate_on_load: bool,

    /// Log every executed rule at debug level.
    pub trace_rules: bool,

    /// Maximum number of runtime warnings retained by the flow.
    pub max_runtime_warnings: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            validate_on_load: true,
            trace_rules: false,
            max_runtime_warnings: 1000,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for loading documents that were validated elsewhere.
    #[must_use]
    pub fn trusted() -> Self {
        Self {
            validate_on_load: false,
            ..Self::default()
        }
    }

    /// Configuration for debugging: rule tracing on, no warning cap.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            trace_rules: true,
            max_runtime_warnings: usize::MAX,
            ..Self::default()
        }
    }

    /// Builder method to set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to enable/disable validation on load.
    #[must_use]
    pub fn with_validate_on_load(mut self, validate: bool) -> Self {
        self.validate_on_load = validate;
        self
    }

    /// Builder method to enable/disable rule tracing.
    #[must_use]
    pub fn with_trace_rules(mut self, trace: bool) -> Self {
        self.trace_rules = trace;
        self
    }

    /// Builder method to set the warning cap.
    #[must_use]
    pub fn with_max_runtime_warnings(mut self, max: usize) -> Self {
        self.max_runtime_warnings = max;
        self
    }
}
