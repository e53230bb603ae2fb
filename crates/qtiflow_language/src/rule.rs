//! Response and outcome processing rules.

use std::sync::Arc;

use qtiflow_foundation::{Error, ErrorKind, Identifier, Result};

use crate::expression::Expression;
use crate::template::TemplateLibrary;

/// Which processing a rule tree belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProcessingKind {
    /// Item response processing.
    Response,
    /// Test outcome processing.
    Outcome,
}

impl ProcessingKind {
    /// Returns the QTI element name of the processing root.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Response => "responseProcessing",
            Self::Outcome => "outcomeProcessing",
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Response => "response",
            Self::Outcome => "outcome",
        }
    }
}

/// A guarded list of rules.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    /// The guard; only boolean TRUE selects the branch.
    pub guard: Expression,
    /// Rules run when selected.
    pub rules: Vec<Rule>,
}

/// `responseCondition` / `outcomeCondition`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionRule {
    /// The `If` branch.
    pub if_branch: Branch,
    /// `ElseIf` branches, in order.
    pub else_ifs: Vec<Branch>,
    /// The `Else` body.
    pub else_rules: Option<Vec<Rule>>,
}

impl ConditionRule {
    /// Creates a condition with only an `If` branch.
    #[must_use]
    pub fn new(guard: Expression, rules: Vec<Rule>) -> Self {
        Self {
            if_branch: Branch { guard, rules },
            else_ifs: Vec::new(),
            else_rules: None,
        }
    }

    /// Appends an `ElseIf` branch.
    #[must_use]
    pub fn else_if(mut self, guard: Expression, rules: Vec<Rule>) -> Self {
        self.else_ifs.push(Branch { guard, rules });
        self
    }

    /// Sets the `Else` body.
    #[must_use]
    pub fn otherwise(mut self, rules: Vec<Rule>) -> Self {
        self.else_rules = Some(rules);
        self
    }

    /// Iterates over the guarded branches in evaluation order.
    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        std::iter::once(&self.if_branch).chain(self.else_ifs.iter())
    }
}

/// A processing rule.
#[derive(Clone, Debug, PartialEq)]
pub enum Rule {
    /// Conditional execution.
    Condition(ConditionRule),
    /// Assigns an outcome variable.
    SetOutcomeValue {
        /// Target variable.
        identifier: Identifier,
        /// Value to assign.
        expression: Expression,
    },
    /// Assigns a response variable.
    SetResponseValue {
        /// Target variable.
        identifier: Identifier,
        /// Value to assign.
        expression: Expression,
    },
    /// Assigns an outcome variable through its lookup table.
    LookupOutcomeValue {
        /// Target variable.
        identifier: Identifier,
        /// Numeric lookup input.
        expression: Expression,
    },
    /// Stops response processing.
    ExitResponse,
    /// Stops outcome processing.
    ExitTest,
}

impl Rule {
    /// Creates a `setOutcomeValue` rule.
    pub fn set_outcome(identifier: impl Into<Identifier>, expression: Expression) -> Self {
        Self::SetOutcomeValue {
            identifier: identifier.into(),
            expression,
        }
    }

    /// Creates a `setResponseValue` rule.
    pub fn set_response(identifier: impl Into<Identifier>, expression: Expression) -> Self {
        Self::SetResponseValue {
            identifier: identifier.into(),
            expression,
        }
    }

    /// Creates a `lookupOutcomeValue` rule.
    pub fn lookup_outcome(identifier: impl Into<Identifier>, expression: Expression) -> Self {
        Self::LookupOutcomeValue {
            identifier: identifier.into(),
            expression,
        }
    }

    /// Returns the path segment naming this rule inside `kind` processing.
    #[must_use]
    pub fn segment(&self, kind: ProcessingKind) -> String {
        match self {
            Self::Condition(_) => format!("{}Condition", kind.prefix()),
            Self::SetOutcomeValue { identifier, .. } => format!("setOutcomeValue[{identifier}]"),
            Self::SetResponseValue { identifier, .. } => format!("setResponseValue[{identifier}]"),
            Self::LookupOutcomeValue { identifier, .. } => {
                format!("lookupOutcomeValue[{identifier}]")
            }
            Self::ExitResponse => "exitResponse".to_string(),
            Self::ExitTest => "exitTest".to_string(),
        }
    }
}

/// Segment names of the branches of a condition rule.
#[must_use]
pub fn branch_segment(kind: ProcessingKind, position: usize) -> String {
    match position {
        0 => format!("{}If", kind.prefix()),
        n => format!("{}ElseIf[{n}]", kind.prefix()),
    }
}

/// Segment name of the `Else` body of a condition rule.
#[must_use]
pub fn else_segment(kind: ProcessingKind) -> String {
    format!("{}Else", kind.prefix())
}

/// A `responseProcessing` or `outcomeProcessing` element.
///
/// When `rules` is empty and `template` is set, the rules come from the
/// template library.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessingTree {
    /// Response or outcome processing.
    pub kind: ProcessingKind,
    /// Template URI.
    pub template: Option<String>,
    /// Inline rules.
    pub rules: Vec<Rule>,
}

impl ProcessingTree {
    /// Creates response processing from inline rules.
    #[must_use]
    pub fn response(rules: Vec<Rule>) -> Self {
        Self {
            kind: ProcessingKind::Response,
            template: None,
            rules,
        }
    }

    /// Creates outcome processing from inline rules.
    #[must_use]
    pub fn outcome(rules: Vec<Rule>) -> Self {
        Self {
            kind: ProcessingKind::Outcome,
            template: None,
            rules,
        }
    }

    /// Creates processing that takes its rules from a template.
    #[must_use]
    pub fn from_template(kind: ProcessingKind, uri: impl Into<String>) -> Self {
        Self {
            kind,
            template: Some(uri.into()),
            rules: Vec::new(),
        }
    }

    /// Returns the rules to run: inline rules, else template rules.
    ///
    /// # Errors
    /// Returns [`ErrorKind::UnresolvedTemplate`] when the template is not
    /// in `templates`.
    pub fn resolve(&self, templates: &TemplateLibrary) -> Result<Arc<Vec<Rule>>> {
        match &self.template {
            Some(uri) if self.rules.is_empty() => templates
                .get(uri)
                .ok_or_else(|| Error::new(ErrorKind::UnresolvedTemplate(uri.clone()))),
            _ => Ok(Arc::new(self.rules.clone())),
        }
    }

    /// Returns true if there are neither rules nor a template.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.template.is_none()
    }
}
