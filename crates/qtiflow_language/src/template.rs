//! Response processing templates.

use std::collections::HashMap;
use std::sync::Arc;

use crate::expression::Expression;
use crate::rule::{ConditionRule, Rule};

/// URI of the standard `match_correct` template.
pub const MATCH_CORRECT: &str = "http://www.imsglobal.org/question/qti_v2p1/rptemplates/match_correct";
/// URI of the standard `map_response` template.
pub const MAP_RESPONSE: &str = "http://www.imsglobal.org/question/qti_v2p1/rptemplates/map_response";

/// Rule lists addressable by template URI.
#[derive(Clone, Debug, Default)]
pub struct TemplateLibrary {
    templates: HashMap<String, Arc<Vec<Rule>>>,
}

impl TemplateLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a library holding the standard templates, which score
    /// `RESPONSE` into `SCORE`.
    #[must_use]
    pub fn standard() -> Self {
        let match_correct = ConditionRule::new(
            Expression::matches(Expression::variable("RESPONSE"), Expression::correct("RESPONSE")),
            vec![Rule::set_outcome("SCORE", Expression::base(1.0))],
        )
        .otherwise(vec![Rule::set_outcome("SCORE", Expression::base(0.0))]);

        let map_response = ConditionRule::new(
            Expression::is_null(Expression::variable("RESPONSE")),
            vec![Rule::set_outcome("SCORE", Expression::base(0.0))],
        )
        .otherwise(vec![Rule::set_outcome(
            "SCORE",
            Expression::map_response("RESPONSE"),
        )]);

        Self::new()
            .with_template(MATCH_CORRECT, vec![Rule::Condition(match_correct)])
            .with_template(MAP_RESPONSE, vec![Rule::Condition(map_response)])
    }

    /// Registers a template.
    #[must_use]
    pub fn with_template(mut self, uri: impl Into<String>, rules: Vec<Rule>) -> Self {
        self.templates.insert(uri.into(), Arc::new(rules));
        self
    }

    /// Returns the rules of a template.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<Arc<Vec<Rule>>> {
        self.templates.get(uri).cloned()
    }

    /// Returns true if `uri` is registered.
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.templates.contains_key(uri)
    }
}
