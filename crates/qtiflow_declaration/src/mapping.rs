//! Response mappings for `mapResponse`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use qtiflow_foundation::{SingleValue, Value};

/// One `mapKey → mappedValue` entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapEntry {
    /// The response value this entry scores.
    pub key: SingleValue,
    /// The score contributed by the key.
    pub value: f64,
}

/// Maps response values to a float score.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mapping {
    /// Entries, first match wins.
    pub entries: Vec<MapEntry>,
    /// Score for elements without an entry.
    pub default_value: f64,
    /// Lower clamp.
    pub lower_bound: Option<f64>,
    /// Upper clamp.
    pub upper_bound: Option<f64>,
}

impl Default for Mapping {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping {
    /// Creates an empty mapping with default value 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            default_value: 0.0,
            lower_bound: None,
            upper_bound: None,
        }
    }

    /// Adds an entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<SingleValue>, value: f64) -> Self {
        self.entries.push(MapEntry {
            key: key.into(),
            value,
        });
        self
    }

    /// Sets the default value.
    #[must_use]
    pub const fn with_default(mut self, default_value: f64) -> Self {
        self.default_value = default_value;
        self
    }

    /// Sets the clamp bounds.
    #[must_use]
    pub const fn with_bounds(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    /// Scores a response value.
    ///
    /// Each distinct element is counted once. NULL scores 0 before
    /// clamping.
    #[must_use]
    pub fn map(&self, response: &Value) -> f64 {
        let mut seen: Vec<SingleValue> = Vec::new();
        let mut total = 0.0;
        for element in response.to_singles() {
            if seen.contains(&element) {
                continue;
            }
            total += self
                .entries
                .iter()
                .find(|e| e.key == element)
                .map_or(self.default_value, |e| e.value);
            seen.push(element);
        }
        self.clamp(total)
    }

    fn clamp(&self, mut total: f64) -> f64 {
        if let Some(lower) = self.lower_bound {
            total = total.max(lower);
        }
        if let Some(upper) = self.upper_bound {
            total = total.min(upper);
        }
        total
    }
}
