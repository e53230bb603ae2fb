//! Response and outcome processing.
//!
//! Rules run depth-first in document order. Each rule yields a [`Control`]:
//! either continue with the next sibling or exit. Every composite matches
//! on it explicitly, so an exit raised deep inside a condition unwinds all
//! the way to [`RuleProcessor::run`], which records it in the report.
//!
//! A rule whose evaluation fails with a recoverable error is skipped with a
//! [`RuntimeWarning`]. A fatal error aborts the run and restores the
//! context to its state before the call.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use qtiflow_declaration::{COMPLETED, COMPLETION_STATUS, NOT_ATTEMPTED, NUM_ATTEMPTS, VariableKind};
use qtiflow_foundation::{Error, ErrorKind, Identifier, Result, Value, VariableRef};
use qtiflow_language::rule::{branch_segment, else_segment};
use qtiflow_language::{
    AssessmentItem, AssessmentTest, Expression, NodePath, ProcessingKind, ProcessingTree, Rule,
    TemplateLibrary,
};

use crate::config::EngineConfig;
use crate::context::{ItemSessionContext, ProcessingContext, TestSessionContext};
use crate::evaluate::evaluate;

// =============================================================================
// Control Flow
// =============================================================================

/// Which early exit was taken.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExitSignal {
    /// `exitResponse`.
    Response,
    /// `exitTest`.
    Test,
}

/// Outcome of executing one rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Control {
    /// Continue with the next rule.
    Continue,
    /// Abandon the remaining rules.
    Exit(ExitSignal),
}

/// A rule skipped at run time.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuntimeWarning {
    /// Path of the skipped rule or guard.
    pub path: String,
    /// Why it was skipped.
    pub message: String,
}

impl fmt::Display for RuntimeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Summary of one processing run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessingReport {
    /// The early exit taken, if any.
    pub exited: Option<ExitSignal>,
    /// Rules skipped at run time.
    pub warnings: Vec<RuntimeWarning>,
    /// Number of rules executed, composites included.
    pub rules_executed: usize,
}

impl ProcessingReport {
    /// Returns true if the run ended with `exitTest`.
    #[must_use]
    pub fn exited_test(&self) -> bool {
        self.exited == Some(ExitSignal::Test)
    }
}

// =============================================================================
// Rule Processor
// =============================================================================

/// Executes processing trees against a context.
#[derive(Clone, Debug)]
pub struct RuleProcessor {
    templates: Arc<TemplateLibrary>,
    trace_rules: bool,
}

impl Default for RuleProcessor {
    fn default() -> Self {
        Self::new(Arc::new(TemplateLibrary::standard()))
    }
}

impl RuleProcessor {
    /// Creates a processor resolving templates from `templates`.
    #[must_use]
    pub fn new(templates: Arc<TemplateLibrary>) -> Self {
        Self {
            templates,
            trace_rules: false,
        }
    }

    /// Creates a processor configured from `config`.
    #[must_use]
    pub fn from_config(config: &EngineConfig, templates: Arc<TemplateLibrary>) -> Self {
        Self::new(templates).with_trace_rules(config.trace_rules)
    }

    /// Builder method to enable/disable rule tracing.
    #[must_use]
    pub fn with_trace_rules(mut self, trace: bool) -> Self {
        self.trace_rules = trace;
        self
    }

    /// Returns the template library.
    #[must_use]
    pub fn templates(&self) -> &Arc<TemplateLibrary> {
        &self.templates
    }

    /// Runs `tree` against `ctx`.
    ///
    /// # Errors
    /// Returns a fatal error, such as an unresolvable template, after
    /// restoring `ctx` to its state before the call.
    pub fn run<C: ProcessingContext>(
        &self,
        tree: &ProcessingTree,
        ctx: &mut C,
    ) -> Result<ProcessingReport> {
        self.run_at(tree, ctx, NodePath::root(tree.kind.name()))
    }

    /// Runs an item's response processing.
    ///
    /// `numAttempts` is incremented first; afterwards `completionStatus`
    /// becomes `completed` if it was still `not_attempted`.
    ///
    /// # Errors
    /// Returns a fatal error after restoring `ctx`.
    pub fn process_responses(
        &self,
        item: &AssessmentItem,
        ctx: &mut ItemSessionContext,
    ) -> Result<ProcessingReport> {
        let snapshot = ctx.snapshot();
        let result = self.process_responses_inner(item, ctx);
        if result.is_err() {
            ctx.restore(snapshot);
        }
        result
    }

    fn process_responses_inner(
        &self,
        item: &AssessmentItem,
        ctx: &mut ItemSessionContext,
    ) -> Result<ProcessingReport> {
        let attempts: Identifier = NUM_ATTEMPTS.into();
        let previous = ctx
            .get(&attempts)
            .as_number()
            .and_then(|n| n.as_integral())
            .unwrap_or(0);
        ctx.set_value(&attempts, Value::integer(previous.saturating_add(1)))?;

        let report = match &item.response_processing {
            Some(tree) => self.run_at(tree, ctx, item.path().child(tree.kind.name()))?,
            None => ProcessingReport::default(),
        };

        let status: Identifier = COMPLETION_STATUS.into();
        if ctx.get(&status) == Value::identifier(NOT_ATTEMPTED) {
            ctx.set_value(&status, Value::identifier(COMPLETED))?;
        }
        Ok(report)
    }

    /// Runs a test's outcome processing; a test without one yields an
    /// empty report.
    ///
    /// # Errors
    /// Returns a fatal error after restoring `ctx`.
    pub fn process_outcomes(
        &self,
        test: &AssessmentTest,
        ctx: &mut TestSessionContext,
    ) -> Result<ProcessingReport> {
        match test.outcome_processing() {
            Some(tree) => {
                let root = test.path(test.root()).child(tree.kind.name());
                self.run_at(tree, ctx, root)
            }
            None => Ok(ProcessingReport::default()),
        }
    }

    fn run_at<C: ProcessingContext>(
        &self,
        tree: &ProcessingTree,
        ctx: &mut C,
        path: NodePath,
    ) -> Result<ProcessingReport> {
        let snapshot = ctx.snapshot();
        let result = tree.resolve(&self.templates).and_then(|rules| {
            let mut execution = Execution {
                ctx: &mut *ctx,
                kind: tree.kind,
                trace: self.trace_rules,
                report: ProcessingReport::default(),
            };
            if let Control::Exit(signal) = execution.rules(&rules, &path)? {
                debug!(%path, ?signal, "processing exited early");
                execution.report.exited = Some(signal);
            }
            Ok(execution.report)
        });
        result.inspect_err(|err| {
            error!(%path, %err, "processing aborted");
            ctx.restore(snapshot);
        })
    }
}

// =============================================================================
// Execution
// =============================================================================

struct Execution<'c, C> {
    ctx: &'c mut C,
    kind: ProcessingKind,
    trace: bool,
    report: ProcessingReport,
}

impl<C: ProcessingContext> Execution<'_, C> {
    fn rules(&mut self, rules: &[Rule], path: &NodePath) -> Result<Control> {
        for rule in rules {
            match self.rule(rule, &path.child(rule.segment(self.kind)))? {
                Control::Continue => {}
                exit @ Control::Exit(_) => return Ok(exit),
            }
        }
        Ok(Control::Continue)
    }

    fn rule(&mut self, rule: &Rule, path: &NodePath) -> Result<Control> {
        self.report.rules_executed += 1;
        if self.trace {
            debug!(%path, "executing rule");
        }
        match rule {
            Rule::Condition(condition) => {
                for (position, branch) in condition.branches().enumerate() {
                    let branch_path = path.child(branch_segment(self.kind, position));
                    if self.guard(&branch.guard, &branch_path)? {
                        return self.rules(&branch.rules, &branch_path);
                    }
                }
                match &condition.else_rules {
                    Some(rules) => self.rules(rules, &path.child(else_segment(self.kind))),
                    None => Ok(Control::Continue),
                }
            }
            Rule::SetOutcomeValue {
                identifier,
                expression,
            } => {
                let result = self.assign(identifier, VariableKind::Outcome, expression);
                self.recover(result, path)?;
                Ok(Control::Continue)
            }
            Rule::SetResponseValue {
                identifier,
                expression,
            } => {
                let result = self.assign(identifier, VariableKind::Response, expression);
                self.recover(result, path)?;
                Ok(Control::Continue)
            }
            Rule::LookupOutcomeValue {
                identifier,
                expression,
            } => {
                let result = self.lookup(identifier, expression);
                self.recover(result, path)?;
                Ok(Control::Continue)
            }
            Rule::ExitResponse => Ok(Control::Exit(ExitSignal::Response)),
            Rule::ExitTest => Ok(Control::Exit(ExitSignal::Test)),
        }
    }

    /// NULL, non-boolean and failing guards count as false.
    fn guard(&mut self, guard: &Expression, path: &NodePath) -> Result<bool> {
        let result = evaluate(guard, self.ctx);
        let Some(value) = self.recover(result, path)? else {
            return Ok(false);
        };
        match value.as_bool() {
            Some(b) => Ok(b),
            None if value.is_null() => Ok(false),
            None => {
                self.warn(path, format!("guard is not a boolean: {value}"));
                Ok(false)
            }
        }
    }

    fn assign(
        &mut self,
        identifier: &Identifier,
        kind: VariableKind,
        expression: &Expression,
    ) -> Result<()> {
        self.check_kind(identifier, kind)?;
        let value = evaluate(expression, self.ctx)?;
        self.ctx.set_value(identifier, value)
    }

    fn lookup(&mut self, identifier: &Identifier, expression: &Expression) -> Result<()> {
        self.check_kind(identifier, VariableKind::Outcome)?;
        let table = self
            .ctx
            .scope()
            .resolve_local(identifier)
            .and_then(|d| d.lookup_table.clone())
            .ok_or_else(|| Error::new(ErrorKind::MissingLookupTable(identifier.clone())))?;

        let input = evaluate(expression, self.ctx)?;
        if input.is_null() {
            return Err(Error::invalid_operand("lookupOutcomeValue", "NULL input"));
        }
        let number = input.as_number().ok_or_else(|| {
            Error::invalid_operand("lookupOutcomeValue", format!("non-numeric input {input}"))
        })?;
        if table.is_match_table() && number.as_integral().is_none() {
            return Err(Error::invalid_operand(
                "lookupOutcomeValue",
                format!("match table needs an integer, got {input}"),
            ));
        }
        let result = table.lookup(number).map_or(Value::Null, Value::Single);
        self.ctx.set_value(identifier, result)
    }

    fn check_kind(&self, identifier: &Identifier, kind: VariableKind) -> Result<()> {
        let declaration = self
            .ctx
            .scope()
            .resolve_local(identifier)
            .ok_or_else(|| Error::undeclared(&VariableRef::local(identifier.clone())))?;
        if declaration.kind == kind {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::WrongVariableKind {
                identifier: identifier.clone(),
                expected: kind.name(),
            }))
        }
    }

    /// Turns a recoverable error into a warning; fatal errors propagate.
    fn recover<T>(&mut self, result: Result<T>, path: &NodePath) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.warn(path, err.to_string());
                Ok(None)
            }
        }
    }

    fn warn(&mut self, path: &NodePath, message: String) {
        warn!(%path, %message, "rule skipped");
        self.report.warnings.push(RuntimeWarning {
            path: path.to_string(),
            message,
        });
    }
}
