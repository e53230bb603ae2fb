//! Lookup tables for `lookupOutcomeValue`.
//!
//! Entries are evaluated in author order and the first match wins, even
//! when a later entry is narrower.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use qtiflow_foundation::{BaseType, Number, SingleValue};

/// The key of a match-table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MatchKey {
    /// Matches exactly this integer.
    Exact(i64),
    /// Matches any integer in `low..=high`.
    Range {
        /// Inclusive lower end.
        low: i64,
        /// Inclusive upper end.
        high: i64,
    },
}

impl MatchKey {
    /// Returns true if `input` falls on this key.
    #[must_use]
    pub const fn matches(self, input: i64) -> bool {
        match self {
            Self::Exact(k) => k == input,
            Self::Range { low, high } => low <= input && input <= high,
        }
    }
}

/// One entry of a match table.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchEntry {
    /// The source key.
    pub key: MatchKey,
    /// The value produced when the key matches.
    pub target: SingleValue,
}

/// One entry of an interpolation table.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterpolationEntry {
    /// Inputs above this bound match.
    pub lower_bound: f64,
    /// Whether an input equal to the bound also matches.
    pub include_boundary: bool,
    /// The value produced when the entry matches.
    pub target: SingleValue,
}

impl InterpolationEntry {
    /// Returns true if `input` lies above the bound.
    #[must_use]
    pub fn matches(&self, input: f64) -> bool {
        input > self.lower_bound || (self.include_boundary && input == self.lower_bound)
    }
}

/// The entries of a lookup table.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LookupEntries {
    /// Integer keys and inclusive ranges.
    Match(Vec<MatchEntry>),
    /// Lower bounds over a numeric input.
    Interpolation(Vec<InterpolationEntry>),
}

/// A lookup table attached to an outcome declaration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LookupTable {
    /// The ordered entries.
    pub entries: LookupEntries,
    /// The value produced when no entry matches.
    pub default: Option<SingleValue>,
}

impl LookupTable {
    /// Creates an empty match table.
    #[must_use]
    pub const fn match_table() -> Self {
        Self {
            entries: LookupEntries::Match(Vec::new()),
            default: None,
        }
    }

    /// Creates an empty interpolation table.
    #[must_use]
    pub const fn interpolation_table() -> Self {
        Self {
            entries: LookupEntries::Interpolation(Vec::new()),
            default: None,
        }
    }

    /// Appends an exact-key entry. Ignored on interpolation tables.
    #[must_use]
    pub fn with_exact(self, key: i64, target: impl Into<SingleValue>) -> Self {
        self.with_match(MatchKey::Exact(key), target)
    }

    /// Appends an inclusive range entry. Ignored on interpolation tables.
    #[must_use]
    pub fn with_range(self, low: i64, high: i64, target: impl Into<SingleValue>) -> Self {
        self.with_match(MatchKey::Range { low, high }, target)
    }

    fn with_match(mut self, key: MatchKey, target: impl Into<SingleValue>) -> Self {
        if let LookupEntries::Match(entries) = &mut self.entries {
            entries.push(MatchEntry {
                key,
                target: target.into(),
            });
        }
        self
    }

    /// Appends a lower-bound entry. Ignored on match tables.
    #[must_use]
    pub fn with_bound(
        mut self,
        lower_bound: f64,
        include_boundary: bool,
        target: impl Into<SingleValue>,
    ) -> Self {
        if let LookupEntries::Interpolation(entries) = &mut self.entries {
            entries.push(InterpolationEntry {
                lower_bound,
                include_boundary,
                target: target.into(),
            });
        }
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<SingleValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Returns true for match tables.
    #[must_use]
    pub const fn is_match_table(&self) -> bool {
        matches!(self.entries, LookupEntries::Match(_))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.entries {
            LookupEntries::Match(e) => e.len(),
            LookupEntries::Interpolation(e) => e.len(),
        }
    }

    /// Returns true if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up `input`.
    ///
    /// Returns the target of the first matching entry, else the default,
    /// else `None`. A non-integral input never matches a match-table entry.
    #[must_use]
    pub fn lookup(&self, input: Number) -> Option<SingleValue> {
        let hit = match &self.entries {
            LookupEntries::Match(entries) => input.as_integral().and_then(|n| {
                entries
                    .iter()
                    .find(|e| e.key.matches(n))
                    .map(|e| e.target.clone())
            }),
            LookupEntries::Interpolation(entries) => {
                let x = input.as_f64();
                entries
                    .iter()
                    .find(|e| e.matches(x))
                    .map(|e| e.target.clone())
            }
        };
        hit.or_else(|| self.default.clone())
    }

    /// Returns every base type the table can produce.
    #[must_use]
    pub fn target_base_types(&self) -> Vec<BaseType> {
        let targets: Box<dyn Iterator<Item = &SingleValue>> = match &self.entries {
            LookupEntries::Match(e) => Box::new(e.iter().map(|e| &e.target)),
            LookupEntries::Interpolation(e) => Box::new(e.iter().map(|e| &e.target)),
        };
        let mut types: Vec<BaseType> = Vec::new();
        for bt in targets.chain(self.default.iter()).map(SingleValue::base_type) {
            if !types.contains(&bt) {
                types.push(bt);
            }
        }
        types
    }

    /// Returns the source keys that appear more than once, rendered for
    /// diagnostics. Later duplicates can never match.
    #[must_use]
    pub fn duplicate_sources(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut duplicates = Vec::new();
        let keys: Vec<String> = match &self.entries {
            LookupEntries::Match(e) => e
                .iter()
                .map(|e| match e.key {
                    MatchKey::Exact(k) => k.to_string(),
                    MatchKey::Range { low, high } => format!("{low}..={high}"),
                })
                .collect(),
            LookupEntries::Interpolation(e) => e
                .iter()
                .map(|e| {
                    let op = if e.include_boundary { ">=" } else { ">" };
                    format!("{op}{}", e.lower_bound)
                })
                .collect(),
        };
        for key in keys {
            if seen.contains(&key) {
                if !duplicates.contains(&key) {
                    duplicates.push(key);
                }
            } else {
                seen.push(key);
            }
        }
        duplicates
    }
}
