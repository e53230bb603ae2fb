//! Item flow: the navigation state machine of one test session.
//!
//! The control-object tree is flattened once into a step list in document
//! order. Every node contributes an enter step (where its preconditions
//! are checked) and a leave step (where its branch rules are checked);
//! item references also contribute an item step, where the walk stops and
//! the item becomes current. Jumps and skips move the cursor along the
//! step list.
//!
//! Every public call is atomic: if it fails, the flow state and the session
//! context are restored to what they were before the call.

use std::sync::Arc;

use tracing::{debug, error, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use qtiflow_declaration::DURATION;
use qtiflow_foundation::{Error, ErrorKind, Identifier, Result, Value, VariableRef};
use qtiflow_language::{
    AssessmentTest, BranchTarget, Expression, JumpDestination, NavigationMode, NodeId, NodePath,
    SubmissionMode, TemplateLibrary, Validator, check_jump,
};

use crate::config::EngineConfig;
use crate::context::{ProcessingContext, TestSessionContext};
use crate::evaluate::evaluate;
use crate::processing::{ProcessingReport, RuleProcessor, RuntimeWarning};

// =============================================================================
// Node State
// =============================================================================

/// Where a node stands in the session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeStatus {
    /// Not reached yet, or never reached.
    NotEntered,
    /// Entered or shown to the candidate.
    Presented,
    /// Submitted, skipped, or left.
    Finished,
}

/// Mutable per-node flags of one session.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeState {
    /// The node was entered (containers) or shown (items).
    pub presented: bool,
    /// The node was submitted, skipped, or left.
    pub finished: bool,
    /// The node was passed over by a precondition, a jump, or the
    /// candidate.
    pub skipped: bool,
    /// Seconds spent inside the node.
    pub elapsed: f64,
}

impl NodeState {
    /// Returns the status of the node.
    #[must_use]
    pub fn status(&self) -> NodeStatus {
        if self.finished {
            NodeStatus::Finished
        } else if self.presented {
            NodeStatus::Presented
        } else {
            NodeStatus::NotEntered
        }
    }
}

// =============================================================================
// Step Plan
// =============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    Enter(NodeId),
    Item(NodeId),
    Leave(NodeId),
}

#[derive(Clone, Debug)]
struct Plan {
    steps: Vec<Step>,
    enter_at: Vec<usize>,
    item_at: Vec<usize>,
    leave_at: Vec<usize>,
}

impl Plan {
    fn new(test: &AssessmentTest) -> Self {
        let mut plan = Self {
            steps: Vec::with_capacity(test.len() * 3),
            enter_at: vec![0; test.len()],
            item_at: vec![0; test.len()],
            leave_at: vec![0; test.len()],
        };
        plan.visit(test, test.root());
        plan
    }

    fn visit(&mut self, test: &AssessmentTest, id: NodeId) {
        let node = test.node(id);
        self.enter_at[id.index()] = self.steps.len();
        self.steps.push(Step::Enter(id));
        if node.is_item_ref() {
            self.item_at[id.index()] = self.steps.len();
            self.steps.push(Step::Item(id));
        }
        for &child in &node.children {
            self.visit(test, child);
        }
        self.leave_at[id.index()] = self.steps.len();
        self.steps.push(Step::Leave(id));
    }
}

#[derive(Clone, Debug)]
struct FlowState {
    nodes: Vec<NodeState>,
    cursor: usize,
    current: Option<NodeId>,
    part: Option<NodeId>,
    started: bool,
    finished: bool,
    warnings: Vec<RuntimeWarning>,
}

// =============================================================================
// Item Flow
// =============================================================================

/// Drives one candidate through a test.
#[derive(Debug)]
pub struct ItemFlow {
    test: Arc<AssessmentTest>,
    config: EngineConfig,
    processor: RuleProcessor,
    plan: Plan,
    context: TestSessionContext,
    state: FlowState,
}

impl ItemFlow {
    /// Creates a flow using the standard template library.
    ///
    /// # Errors
    /// Returns [`ErrorKind::ValidationFailed`] when `config.validate_on_load`
    /// is set and the test has validation errors.
    pub fn new(test: Arc<AssessmentTest>, config: EngineConfig) -> Result<Self> {
        Self::with_templates(test, config, Arc::new(TemplateLibrary::standard()))
    }

    /// Creates a flow resolving templates from `templates`.
    ///
    /// # Errors
    /// Returns [`ErrorKind::ValidationFailed`] when `config.validate_on_load`
    /// is set and the test has validation errors.
    pub fn with_templates(
        test: Arc<AssessmentTest>,
        config: EngineConfig,
        templates: Arc<TemplateLibrary>,
    ) -> Result<Self> {
        if config.validate_on_load {
            let report = Validator::new(&templates).validate_test(&test);
            if !report.is_valid() {
                for diagnostic in report.errors() {
                    debug!(%diagnostic, "validation error");
                }
                let errors = report.error_count();
                error!(test = %test.identifier(), errors, "test failed validation");
                return Err(Error::new(ErrorKind::ValidationFailed { errors }));
            }
        }
        let processor = RuleProcessor::from_config(&config, templates);
        let context = TestSessionContext::new(Arc::clone(&test), config.seed);
        let state = FlowState {
            nodes: vec![NodeState::default(); test.len()],
            cursor: 0,
            current: None,
            part: None,
            started: false,
            finished: false,
            warnings: Vec::new(),
        };
        Ok(Self {
            plan: Plan::new(&test),
            test,
            config,
            processor,
            context,
            state,
        })
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Returns the test.
    #[must_use]
    pub fn test(&self) -> &Arc<AssessmentTest> {
        &self.test
    }

    /// Returns the session's variables.
    #[must_use]
    pub fn context(&self) -> &TestSessionContext {
        &self.context
    }

    /// Reads a test variable or, qualified, an item variable.
    ///
    /// # Errors
    /// Returns the scope's resolution error.
    pub fn value(&self, reference: &VariableRef) -> Result<Value> {
        self.context.value(reference)
    }

    /// Returns the current item reference.
    #[must_use]
    pub fn current_item(&self) -> Option<NodeId> {
        self.state.current
    }

    /// Returns the current test part.
    #[must_use]
    pub fn current_test_part(&self) -> Option<NodeId> {
        self.state.part
    }

    /// Returns the state of a node.
    #[must_use]
    pub fn node_state(&self, id: NodeId) -> &NodeState {
        &self.state.nodes[id.index()]
    }

    /// Returns true once the test has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Returns the runtime warnings collected so far.
    #[must_use]
    pub fn warnings(&self) -> &[RuntimeWarning] {
        &self.state.warnings
    }

    /// Returns the time left for the current item: the smallest
    /// `limit - elapsed` over the item and its ancestors. `None` when no
    /// limit applies.
    #[must_use]
    pub fn remaining_time(&self) -> Option<f64> {
        let id = self.state.current?;
        std::iter::once(id)
            .chain(self.test.ancestors(id))
            .filter_map(|n| {
                self.test
                    .node(n)
                    .time_limit
                    .map(|limit| limit - self.state.nodes[n.index()].elapsed)
            })
            .reduce(f64::min)
    }

    /// Returns true if the current item may be submitted.
    #[must_use]
    pub fn submit_enabled(&self) -> bool {
        self.state
            .current
            .is_some_and(|id| !self.state.nodes[id.index()].finished)
            && self.remaining_time().is_none_or(|left| left > 0.0)
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Enters the test and moves to its first item.
    ///
    /// # Errors
    /// Fails if the test was already entered, or with the fatal error of a
    /// branch rule taken on the way.
    pub fn enter(&mut self) -> Result<()> {
        self.atomically(|flow| {
            if flow.state.started {
                return Err(Error::navigation("the test was already entered"));
            }
            flow.state.started = true;
            debug!(test = %flow.test.identifier(), "entering test");
            flow.walk()
        })
    }

    /// Makes `item_ref` current. Only in nonlinear test parts.
    ///
    /// # Errors
    /// Fails outside a nonlinear part, for items of other parts, and for
    /// finished items that do not allow review.
    pub fn select_item(&mut self, item_ref: &Identifier) -> Result<()> {
        self.atomically(|flow| {
            flow.ensure_active()?;
            let part = flow
                .state
                .part
                .ok_or_else(|| Error::navigation("no test part is active"))?;
            if flow.navigation_mode() != Some(NavigationMode::Nonlinear) {
                return Err(Error::navigation("items can only be selected in nonlinear test parts"));
            }
            let id = flow
                .test
                .find(item_ref)
                .ok_or_else(|| Error::new(ErrorKind::UnknownNode(item_ref.clone())))?;
            let node = flow.test.node(id);
            if !node.is_item_ref() || flow.test.test_part_of(id) != Some(part) {
                return Err(Error::navigation(format!(
                    "{item_ref} is not an item of the current test part"
                )));
            }
            let review = node.session_control().is_some_and(|c| c.allow_review);
            if flow.state.nodes[id.index()].finished && !review {
                return Err(Error::navigation(format!("{item_ref} does not allow review")));
            }
            flow.present(id);
            Ok(())
        })
    }

    /// Sets a response variable of the current item.
    ///
    /// # Errors
    /// Fails without a current unfinished item, for variables that are not
    /// candidate responses, and for values of the wrong signature.
    pub fn set_response(&mut self, identifier: impl Into<Identifier>, value: Value) -> Result<()> {
        let identifier = identifier.into();
        self.atomically(|flow| {
            let id = flow.current_unfinished()?;
            let item_ref = flow.test.node(id).identifier.clone();
            let session = flow.context.item_mut(&item_ref)?;
            let settable = session
                .declarations()
                .get(&identifier)
                .is_some_and(|d| d.is_response() && !d.builtin);
            if !settable {
                return Err(Error::navigation(format!(
                    "{identifier} is not a response of {item_ref}"
                )));
            }
            session.set_value(&identifier, value)
        })
    }

    /// Submits the current item.
    ///
    /// In individual submission mode the item's response processing runs
    /// now, followed by the test's outcome processing; in simultaneous mode
    /// both are deferred to the end of the test part.
    ///
    /// # Errors
    /// Fails without a current unfinished item, once time has run out, or
    /// with a fatal processing error.
    pub fn finish_item(&mut self) -> Result<()> {
        self.atomically(|flow| {
            let id = flow.current_unfinished()?;
            if !flow.submit_enabled() {
                return Err(Error::navigation("the time limit has been reached"));
            }
            flow.state.nodes[id.index()].finished = true;
            debug!(item = %flow.test.node(id).identifier, "item finished");
            if flow.submission_mode() != Some(SubmissionMode::Simultaneous) {
                flow.process_item(id)?;
                flow.process_test_outcomes()?;
            }
            Ok(())
        })
    }

    /// Skips the current item without submitting it.
    ///
    /// # Errors
    /// Fails in simultaneous submission mode and when the item does not
    /// allow skipping.
    pub fn skip_item(&mut self) -> Result<()> {
        self.atomically(|flow| {
            let id = flow.current_unfinished()?;
            let node = flow.test.node(id);
            if flow.submission_mode() == Some(SubmissionMode::Simultaneous) {
                return Err(Error::navigation(
                    "items cannot be skipped in simultaneous submission mode",
                ));
            }
            if !node.session_control().is_some_and(|c| c.allow_skipping) {
                return Err(Error::navigation(format!(
                    "{} does not allow skipping",
                    node.identifier
                )));
            }
            let state = &mut flow.state.nodes[id.index()];
            state.skipped = true;
            state.finished = true;
            debug!(item = %node.identifier, "item skipped");
            Ok(())
        })
    }

    /// Moves past the current item to the next one in the walk.
    ///
    /// # Errors
    /// Fails when leaving an unfinished item of a linear individual part,
    /// or with the fatal error of a branch rule.
    pub fn advance(&mut self) -> Result<()> {
        self.atomically(|flow| {
            flow.ensure_active()?;
            let id = flow
                .state
                .current
                .ok_or_else(|| Error::navigation("no item is current"))?;
            flow.ensure_may_leave(id)?;
            flow.state.current = None;
            flow.state.cursor = flow.plan.leave_at[id.index()];
            flow.walk()
        })
    }

    /// Jumps from the finished current item to `target`, as a branch rule
    /// would.
    ///
    /// # Errors
    /// Fails outside linear individual parts, before the item is finished,
    /// and with [`ErrorKind::IllegalJump`] for illegal targets.
    pub fn jump_to(&mut self, target: impl Into<BranchTarget>) -> Result<()> {
        let target = target.into();
        self.atomically(|flow| {
            flow.ensure_active()?;
            let id = flow
                .state
                .current
                .ok_or_else(|| Error::navigation("no item is current"))?;
            if !flow.test.jumps_enabled(id) {
                return Err(Error::navigation("jumps need a linear individual test part"));
            }
            if !flow.state.nodes[id.index()].finished {
                return Err(Error::navigation("the current item must be finished first"));
            }
            let test = Arc::clone(&flow.test);
            let destination = check_jump(&test, id, &target)
                .map_err(|v| v.into_error(&test.node(id).identifier, &target))?;
            flow.state.current = None;
            flow.state.cursor = flow.plan.leave_at[id.index()];
            flow.apply(destination);
            flow.walk()
        })
    }

    /// Ends the current test part and moves to the next.
    ///
    /// # Errors
    /// Fails outside a test part, or when leaving an unfinished item of a
    /// linear individual part.
    pub fn end_test_part(&mut self) -> Result<()> {
        self.atomically(|flow| {
            flow.ensure_active()?;
            let part = flow
                .state
                .part
                .ok_or_else(|| Error::navigation("no test part is active"))?;
            let from = match flow.state.current.take() {
                Some(id) => {
                    flow.ensure_may_leave(id)?;
                    flow.plan.item_at[id.index()] + 1
                }
                None => flow.state.cursor,
            };
            let to = flow.plan.leave_at[part.index()];
            flow.pass_over(from, to, false);
            flow.state.cursor = to;
            debug!(part = %flow.test.node(part).identifier, "ending test part");
            flow.walk()
        })
    }

    /// Adds `seconds` to the current item and all of its ancestors.
    ///
    /// # Errors
    /// Fails without a current item or for a negative duration.
    pub fn elapse(&mut self, seconds: f64) -> Result<()> {
        self.atomically(|flow| {
            flow.ensure_active()?;
            if seconds.is_nan() || seconds < 0.0 {
                return Err(Error::navigation(format!("cannot elapse {seconds} seconds")));
            }
            let id = flow
                .state
                .current
                .ok_or_else(|| Error::navigation("no item is current"))?;
            for n in std::iter::once(id).chain(flow.test.ancestors(id)) {
                flow.state.nodes[n.index()].elapsed += seconds;
            }

            let duration: Identifier = DURATION.into();
            let test_elapsed = flow.state.nodes[flow.test.root().index()].elapsed;
            flow.context
                .set_value(&duration, Value::duration(test_elapsed))?;
            let item_elapsed = flow.state.nodes[id.index()].elapsed;
            let item_ref = flow.test.node(id).identifier.clone();
            flow.context
                .item_mut(&item_ref)?
                .set_value(&duration, Value::duration(item_elapsed))
        })
    }

    // -------------------------------------------------------------------------
    // Walk
    // -------------------------------------------------------------------------

    /// Runs steps from the cursor until an item becomes current or the
    /// test ends.
    fn walk(&mut self) -> Result<()> {
        let test = Arc::clone(&self.test);
        while !self.state.finished {
            let Some(&step) = self.plan.steps.get(self.state.cursor) else {
                self.finish();
                break;
            };
            match step {
                Step::Enter(id) => {
                    self.state.cursor = if self.enter_node(id) {
                        self.plan.enter_at[id.index()] + 1
                    } else {
                        self.plan.leave_at[id.index()] + 1
                    };
                }
                Step::Item(id) => {
                    self.present(id);
                    return Ok(());
                }
                Step::Leave(id) => {
                    let node = test.node(id);
                    if !node.is_item_ref() {
                        self.state.nodes[id.index()].finished = true;
                    }
                    if id == test.root() {
                        self.finish();
                        break;
                    }
                    if node.is_test_part() {
                        self.end_part(id)?;
                        if self.state.finished {
                            break;
                        }
                    }
                    match self.branch(id)? {
                        Some(destination) => self.apply(destination),
                        None => self.state.cursor += 1,
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs the enter step of `id`. Returns false if its preconditions
    /// failed, in which case its whole subtree is skipped.
    fn enter_node(&mut self, id: NodeId) -> bool {
        let test = Arc::clone(&self.test);
        let node = test.node(id);
        if node.is_test_part() {
            self.state.part = Some(id);
            debug!(part = %node.identifier, "entering test part");
        }
        if self.preconditions_hold(id) {
            if !node.is_item_ref() {
                self.state.nodes[id.index()].presented = true;
            }
            true
        } else {
            debug!(node = %node.identifier, "preconditions failed");
            self.skip_subtree(id);
            if self.state.part == Some(id) {
                self.state.part = None;
            }
            false
        }
    }

    fn present(&mut self, id: NodeId) {
        self.state.current = Some(id);
        self.state.cursor = self.plan.item_at[id.index()];
        self.state.nodes[id.index()].presented = true;
        debug!(item = %self.test.node(id).identifier, "item presented");
    }

    fn finish(&mut self) {
        self.state.finished = true;
        self.state.current = None;
        self.state.part = None;
        self.state.cursor = self.plan.steps.len();
        debug!(test = %self.test.identifier(), "test finished");
    }

    fn preconditions_hold(&mut self, id: NodeId) -> bool {
        if id == self.test.root() || !self.test.jumps_enabled(id) {
            return true;
        }
        let test = Arc::clone(&self.test);
        let path = test.path(id).child("preCondition");
        test.node(id)
            .preconditions
            .iter()
            .all(|guard| self.guard_holds(guard, &path))
    }

    /// Returns the destination of the first branch rule whose guard holds.
    fn branch(&mut self, id: NodeId) -> Result<Option<JumpDestination>> {
        if !self.test.jumps_enabled(id) {
            return Ok(None);
        }
        let test = Arc::clone(&self.test);
        let node = test.node(id);
        let path = test.path(id);
        for rule in &node.branch_rules {
            let rule_path = path.child_named("branchRule", &rule.target);
            if self.guard_holds(&rule.guard, &rule_path) {
                let destination = check_jump(&test, id, &rule.target)
                    .map_err(|v| v.into_error(&node.identifier, &rule.target))?;
                debug!(from = %node.identifier, to = %rule.target, "branch taken");
                return Ok(Some(destination));
            }
        }
        Ok(None)
    }

    /// Continues after a jump taken at the step under the cursor.
    ///
    /// Containers between the source and a jump target are entered on the
    /// way in, so their preconditions still apply.
    fn apply(&mut self, destination: JumpDestination) {
        let mut from = self.state.cursor + 1;
        match destination {
            JumpDestination::Stay => self.state.cursor = from,
            JumpDestination::Enter(target) => {
                let mut outer = self.test.ancestors(target);
                outer.retain(|a| self.plan.enter_at[a.index()] >= from);
                for ancestor in outer.into_iter().rev() {
                    let at = self.plan.enter_at[ancestor.index()];
                    self.pass_over(from, at, true);
                    if !self.enter_node(ancestor) {
                        self.state.cursor = self.plan.leave_at[ancestor.index()] + 1;
                        return;
                    }
                    from = at + 1;
                }
                let to = self.plan.enter_at[target.index()];
                self.pass_over(from, to, true);
                self.state.cursor = to;
            }
            JumpDestination::Exit(container) => {
                let to = self.plan.leave_at[container.index()];
                self.pass_over(from, to, true);
                self.state.cursor = to;
            }
        }
    }

    /// Passes over the steps in `from..to` without running them.
    fn pass_over(&mut self, from: usize, to: usize, mark_skipped: bool) {
        for index in from..to.min(self.plan.steps.len()) {
            match self.plan.steps[index] {
                Step::Enter(id) | Step::Item(id) => {
                    let state = &mut self.state.nodes[id.index()];
                    if mark_skipped && !state.presented {
                        state.skipped = true;
                    }
                }
                Step::Leave(id) => {
                    let state = &mut self.state.nodes[id.index()];
                    if state.presented {
                        state.finished = true;
                    }
                    if self.state.part == Some(id) {
                        self.state.part = None;
                    }
                }
            }
        }
    }

    fn skip_subtree(&mut self, id: NodeId) {
        for index in id.index()..self.test.subtree_end(id) {
            self.state.nodes[index].skipped = true;
        }
    }

    fn end_part(&mut self, part: NodeId) -> Result<()> {
        let deferred = self
            .test
            .node(part)
            .part_modes()
            .is_some_and(|(_, submission)| submission == SubmissionMode::Simultaneous);
        if deferred {
            for id in self.test.item_refs_in(part) {
                if self.state.nodes[id.index()].presented {
                    self.state.nodes[id.index()].finished = true;
                    self.process_item(id)?;
                }
            }
            self.process_test_outcomes()?;
        }
        self.state.part = None;
        debug!(part = %self.test.node(part).identifier, "left test part");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Processing
    // -------------------------------------------------------------------------

    fn process_item(&mut self, id: NodeId) -> Result<()> {
        let node = self.test.node(id);
        let item = node
            .item()
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::ItemNotResolved(node.identifier.clone())))?;
        let item_ref = node.identifier.clone();
        let session = self.context.item_mut(&item_ref)?;
        let report = self.processor.process_responses(&item, session)?;
        self.record(report);
        Ok(())
    }

    fn process_test_outcomes(&mut self) -> Result<()> {
        let report = self.processor.process_outcomes(&self.test, &mut self.context)?;
        let exited = report.exited_test();
        self.record(report);
        if exited {
            debug!("exitTest ended the test");
            self.finish();
        }
        Ok(())
    }

    fn record(&mut self, report: ProcessingReport) {
        for warning in report.warnings {
            self.push_warning(warning);
        }
    }

    /// NULL, non-boolean and failing guards count as false.
    fn guard_holds(&mut self, guard: &Expression, path: &NodePath) -> bool {
        match evaluate(guard, &mut self.context) {
            Ok(value) => match value.as_bool() {
                Some(b) => b,
                None => {
                    if !value.is_null() {
                        self.warn(path, format!("guard is not a boolean: {value}"));
                    }
                    false
                }
            },
            Err(err) => {
                self.warn(path, err.to_string());
                false
            }
        }
    }

    fn warn(&mut self, path: &NodePath, message: String) {
        warn!(%path, %message, "guard ignored");
        self.push_warning(RuntimeWarning {
            path: path.to_string(),
            message,
        });
    }

    fn push_warning(&mut self, warning: RuntimeWarning) {
        if self.state.warnings.len() < self.config.max_runtime_warnings {
            self.state.warnings.push(warning);
        }
    }

    // -------------------------------------------------------------------------
    // Checks
    // -------------------------------------------------------------------------

    fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let state = self.state.clone();
        let snapshot = self.context.snapshot();
        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                error!(%err, "navigation call failed; session restored");
                self.state = state;
                self.context.restore(snapshot);
                Err(err)
            }
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.state.started {
            Err(Error::navigation("the test has not been entered"))
        } else if self.state.finished {
            Err(Error::navigation("the test is finished"))
        } else {
            Ok(())
        }
    }

    fn current_unfinished(&self) -> Result<NodeId> {
        self.ensure_active()?;
        let id = self
            .state
            .current
            .ok_or_else(|| Error::navigation("no item is current"))?;
        if self.state.nodes[id.index()].finished {
            return Err(Error::navigation(format!(
                "{} is already finished",
                self.test.node(id).identifier
            )));
        }
        Ok(id)
    }

    fn ensure_may_leave(&self, id: NodeId) -> Result<()> {
        if self.test.jumps_enabled(id) && !self.state.nodes[id.index()].finished {
            return Err(Error::navigation(format!(
                "{} must be finished before moving on",
                self.test.node(id).identifier
            )));
        }
        Ok(())
    }

    fn part_modes(&self) -> Option<(NavigationMode, SubmissionMode)> {
        self.state
            .part
            .and_then(|part| self.test.node(part).part_modes())
    }

    fn navigation_mode(&self) -> Option<NavigationMode> {
        self.part_modes().map(|(navigation, _)| navigation)
    }

    fn submission_mode(&self) -> Option<SubmissionMode> {
        self.part_modes().map(|(_, submission)| submission)
    }
}
