//! The control-object tree of an assessment test.
//!
//! Nodes live in an arena in document (pre-order) order, so a [`NodeId`]
//! doubles as the node's global position: comparing two ids compares
//! their order in the test.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use qtiflow_declaration::{Declarations, ItemRefScope, TestScope, VariableDeclaration, VariableMappings};
use qtiflow_foundation::{Error, ErrorKind, Identifier, Result};

use crate::expression::Expression;
use crate::item::AssessmentItem;
use crate::path::NodePath;
use crate::rule::ProcessingTree;

// =============================================================================
// Node Types
// =============================================================================

/// Index of a node in its test; also its pre-order position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the pre-order position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Order in which a test part presents its items.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NavigationMode {
    /// Items in document order, no going back.
    Linear,
    /// Items in any order.
    Nonlinear,
}

/// When a test part processes responses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubmissionMode {
    /// Each item is processed when it is finished.
    Individual,
    /// All items are processed when the part ends.
    Simultaneous,
}

/// Per-item-reference session control.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ItemSessionControl {
    /// Whether the candidate may skip the item.
    pub allow_skipping: bool,
    /// Whether a finished item may be revisited.
    pub allow_review: bool,
}

impl Default for ItemSessionControl {
    fn default() -> Self {
        Self {
            allow_skipping: true,
            allow_review: true,
        }
    }
}

/// Special and ordinary branch targets.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BranchTarget {
    /// `EXIT_TEST`.
    ExitTest,
    /// `EXIT_TESTPART`.
    ExitTestPart,
    /// `EXIT_SECTION`.
    ExitSection,
    /// A control object by identifier.
    Node(Identifier),
}

impl BranchTarget {
    /// Returns the target as written in the document.
    #[must_use]
    pub fn identifier(&self) -> Identifier {
        match self {
            Self::Node(id) => id.clone(),
            special => Identifier::from(special.to_string()),
        }
    }
}

impl From<&str> for BranchTarget {
    fn from(s: &str) -> Self {
        match s {
            "EXIT_TEST" => Self::ExitTest,
            "EXIT_TESTPART" => Self::ExitTestPart,
            "EXIT_SECTION" => Self::ExitSection,
            other => Self::Node(other.into()),
        }
    }
}

impl fmt::Display for BranchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitTest => f.write_str("EXIT_TEST"),
            Self::ExitTestPart => f.write_str("EXIT_TESTPART"),
            Self::ExitSection => f.write_str("EXIT_SECTION"),
            Self::Node(id) => write!(f, "{id}"),
        }
    }
}

/// A conditional jump taken when leaving a node.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchRule {
    /// Where to jump.
    pub target: BranchTarget,
    /// Jump when TRUE.
    pub guard: Expression,
}

/// What a control object is.
#[derive(Clone, Debug)]
pub enum ControlKind {
    /// The test root.
    Test,
    /// A test part.
    TestPart {
        /// Navigation mode.
        navigation_mode: NavigationMode,
        /// Submission mode.
        submission_mode: SubmissionMode,
    },
    /// An assessment section.
    Section,
    /// A reference to an item.
    ItemRef {
        /// The referenced item, when resolved.
        item: Option<Arc<AssessmentItem>>,
        /// Test-side to item-side variable renames.
        mappings: VariableMappings,
        /// Skipping and review permissions.
        session_control: ItemSessionControl,
    },
}

impl ControlKind {
    /// Returns the QTI element name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Test => "assessmentTest",
            Self::TestPart { .. } => "testPart",
            Self::Section => "assessmentSection",
            Self::ItemRef { .. } => "assessmentItemRef",
        }
    }
}

/// One node of the control-object tree.
#[derive(Clone, Debug)]
pub struct ControlNode {
    /// Identifier.
    pub identifier: Identifier,
    /// Node kind.
    pub kind: ControlKind,
    /// Parent node; `None` for the root.
    pub parent: Option<NodeId>,
    /// Children in document order.
    pub children: Vec<NodeId>,
    /// Preconditions, all of which must be TRUE to enter the node.
    pub preconditions: Vec<Expression>,
    /// Branch rules, evaluated in order when leaving the node.
    pub branch_rules: Vec<BranchRule>,
    /// Maximum time in seconds.
    pub time_limit: Option<f64>,
    subtree_end: usize,
}

impl ControlNode {
    fn new(identifier: Identifier, kind: ControlKind, parent: Option<NodeId>) -> Self {
        Self {
            identifier,
            kind,
            parent,
            children: Vec::new(),
            preconditions: Vec::new(),
            branch_rules: Vec::new(),
            time_limit: None,
            subtree_end: 0,
        }
    }

    /// Returns true for test parts.
    #[must_use]
    pub const fn is_test_part(&self) -> bool {
        matches!(self.kind, ControlKind::TestPart { .. })
    }

    /// Returns true for item references.
    #[must_use]
    pub const fn is_item_ref(&self) -> bool {
        matches!(self.kind, ControlKind::ItemRef { .. })
    }

    /// Returns the referenced item, if this is a resolved item reference.
    #[must_use]
    pub fn item(&self) -> Option<&Arc<AssessmentItem>> {
        match &self.kind {
            ControlKind::ItemRef { item, .. } => item.as_ref(),
            _ => None,
        }
    }

    /// Returns the session control of an item reference.
    #[must_use]
    pub fn session_control(&self) -> Option<ItemSessionControl> {
        match &self.kind {
            ControlKind::ItemRef {
                session_control, ..
            } => Some(*session_control),
            _ => None,
        }
    }

    /// Returns the modes of a test part.
    #[must_use]
    pub const fn part_modes(&self) -> Option<(NavigationMode, SubmissionMode)> {
        match self.kind {
            ControlKind::TestPart {
                navigation_mode,
                submission_mode,
            } => Some((navigation_mode, submission_mode)),
            _ => None,
        }
    }

    /// Returns the segment naming this node in a path.
    #[must_use]
    pub fn segment(&self) -> String {
        format!("{}[{}]", self.kind.name(), self.identifier)
    }
}

// =============================================================================
// Assessment Test
// =============================================================================

/// An immutable, shareable assessment test.
#[derive(Clone, Debug)]
pub struct AssessmentTest {
    nodes: Vec<ControlNode>,
    index: HashMap<Identifier, NodeId>,
    declarations: Arc<Declarations>,
    outcome_processing: Option<ProcessingTree>,
}

impl AssessmentTest {
    /// Returns the test identifier.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.nodes[0].identifier
    }

    /// Returns the root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns a node.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this test.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ControlNode {
        &self.nodes[id.0]
    }

    /// Returns the number of nodes, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a test has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ControlNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Finds the first node with `identifier`.
    #[must_use]
    pub fn find(&self, identifier: &Identifier) -> Option<NodeId> {
        self.index.get(identifier).copied()
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the ancestors of a node, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            out.push(p);
            cursor = self.parent(p);
        }
        out
    }

    /// Returns true if `node` is a strict descendant of `ancestor`.
    #[must_use]
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        ancestor.0 < node.0 && node.0 < self.node(ancestor).subtree_end
    }

    /// Returns the position just past the last descendant of `id`.
    #[must_use]
    pub fn subtree_end(&self, id: NodeId) -> usize {
        self.node(id).subtree_end
    }

    /// Returns the test part containing `id`, or `id` itself for a part.
    #[must_use]
    pub fn test_part_of(&self, id: NodeId) -> Option<NodeId> {
        if self.node(id).is_test_part() {
            return Some(id);
        }
        self.ancestors(id)
            .into_iter()
            .find(|&a| self.node(a).is_test_part())
    }

    /// Returns true if preconditions and branch rules apply at `id`:
    /// only inside linear, individual test parts.
    #[must_use]
    pub fn jumps_enabled(&self, id: NodeId) -> bool {
        self.test_part_of(id)
            .and_then(|p| self.node(p).part_modes())
            .is_some_and(|modes| modes == (NavigationMode::Linear, SubmissionMode::Individual))
    }

    /// Returns the test parts in document order.
    #[must_use]
    pub fn test_parts(&self) -> Vec<NodeId> {
        self.node(self.root()).children.clone()
    }

    /// Iterates over all item references in document order.
    pub fn item_refs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
            .filter(|(_, n)| n.is_item_ref())
            .map(|(id, _)| id)
    }

    /// Returns the item references inside `container`, in document order.
    #[must_use]
    pub fn item_refs_in(&self, container: NodeId) -> Vec<NodeId> {
        (container.0 + 1..self.subtree_end(container))
            .map(NodeId)
            .filter(|&id| self.node(id).is_item_ref())
            .collect()
    }

    /// Returns the test-level declarations.
    #[must_use]
    pub fn declarations(&self) -> &Arc<Declarations> {
        &self.declarations
    }

    /// Returns the outcome processing.
    #[must_use]
    pub fn outcome_processing(&self) -> Option<&ProcessingTree> {
        self.outcome_processing.as_ref()
    }

    /// Builds the variable scope of test-level expressions.
    #[must_use]
    pub fn scope(&self) -> TestScope {
        let mut scope = TestScope::new(Arc::clone(&self.declarations));
        for id in self.item_refs() {
            let node = self.node(id);
            if let ControlKind::ItemRef { item, mappings, .. } = &node.kind {
                scope.add_item_ref(
                    node.identifier.clone(),
                    ItemRefScope {
                        mappings: mappings.clone(),
                        declarations: item.as_ref().map(|i| Arc::clone(&i.declarations)),
                    },
                );
            }
        }
        scope
    }

    /// Returns the path of a node.
    #[must_use]
    pub fn path(&self, id: NodeId) -> NodePath {
        let mut chain = self.ancestors(id);
        chain.reverse();
        chain.push(id);
        let mut iter = chain.into_iter();
        let mut path = NodePath::root(self.node(iter.next().unwrap_or(id)).segment());
        for node in iter {
            path = path.child(self.node(node).segment());
        }
        path
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles an [`AssessmentTest`] in document order.
///
/// Containers opened with [`TestBuilder::test_part`] and
/// [`TestBuilder::section`] stay open until [`TestBuilder::end`]. Attribute
/// methods such as [`TestBuilder::precondition`] apply to the node added or
/// closed most recently.
#[derive(Debug)]
pub struct TestBuilder {
    nodes: Vec<ControlNode>,
    open: Vec<NodeId>,
    last: NodeId,
    declarations: Declarations,
    outcome_processing: Option<ProcessingTree>,
    error: Option<String>,
}

impl TestBuilder {
    /// Starts a test.
    #[must_use]
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            nodes: vec![ControlNode::new(identifier.into(), ControlKind::Test, None)],
            open: vec![NodeId(0)],
            last: NodeId(0),
            declarations: Declarations::test(),
            outcome_processing: None,
            error: None,
        }
    }

    /// Adds a test-level declaration.
    #[must_use]
    pub fn declare(mut self, declaration: VariableDeclaration) -> Self {
        self.declarations.declare(declaration);
        self
    }

    /// Sets outcome processing.
    #[must_use]
    pub fn outcome_processing(mut self, processing: ProcessingTree) -> Self {
        self.outcome_processing = Some(processing);
        self
    }

    /// Opens a test part.
    #[must_use]
    pub fn test_part(
        self,
        identifier: impl Into<Identifier>,
        navigation_mode: NavigationMode,
        submission_mode: SubmissionMode,
    ) -> Self {
        let kind = ControlKind::TestPart {
            navigation_mode,
            submission_mode,
        };
        self.push(identifier.into(), kind, true)
    }

    /// Opens a section.
    #[must_use]
    pub fn section(self, identifier: impl Into<Identifier>) -> Self {
        self.push(identifier.into(), ControlKind::Section, true)
    }

    /// Adds a reference to a resolved item.
    #[must_use]
    pub fn item_ref(self, identifier: impl Into<Identifier>, item: Arc<AssessmentItem>) -> Self {
        self.push(identifier.into(), Self::item_kind(Some(item)), false)
    }

    /// Adds a reference whose item could not be resolved.
    #[must_use]
    pub fn unresolved_item_ref(self, identifier: impl Into<Identifier>) -> Self {
        self.push(identifier.into(), Self::item_kind(None), false)
    }

    fn item_kind(item: Option<Arc<AssessmentItem>>) -> ControlKind {
        ControlKind::ItemRef {
            item,
            mappings: VariableMappings::new(),
            session_control: ItemSessionControl::default(),
        }
    }

    /// Closes the innermost open test part or section.
    #[must_use]
    pub fn end(mut self) -> Self {
        if self.open.len() > 1 {
            if let Some(closed) = self.open.pop() {
                self.last = closed;
            }
        } else {
            self.fail("end() without an open test part or section");
        }
        self
    }

    /// Adds a precondition to the current node.
    #[must_use]
    pub fn precondition(mut self, guard: Expression) -> Self {
        let last = self.last.0;
        self.nodes[last].preconditions.push(guard);
        self
    }

    /// Adds a branch rule to the current node.
    #[must_use]
    pub fn branch_rule(mut self, target: impl Into<BranchTarget>, guard: Expression) -> Self {
        let last = self.last.0;
        self.nodes[last].branch_rules.push(BranchRule {
            target: target.into(),
            guard,
        });
        self
    }

    /// Sets the maximum time of the current node, in seconds.
    #[must_use]
    pub fn time_limit(mut self, seconds: f64) -> Self {
        let last = self.last.0;
        self.nodes[last].time_limit = Some(seconds);
        self
    }

    /// Renames a test-side variable of the current item reference.
    #[must_use]
    pub fn variable_mapping(
        mut self,
        source: impl Into<Identifier>,
        target: impl Into<Identifier>,
    ) -> Self {
        let last = self.last.0;
        if let ControlKind::ItemRef { mappings, .. } = &mut self.nodes[last].kind {
            mappings.insert(source.into(), target.into());
        } else {
            self.fail("variable mappings belong to item references");
        }
        self
    }

    /// Sets the session control of the current item reference.
    #[must_use]
    pub fn session_control(mut self, control: ItemSessionControl) -> Self {
        let last = self.last.0;
        if let ControlKind::ItemRef {
            session_control, ..
        } = &mut self.nodes[last].kind
        {
            *session_control = control;
        } else {
            self.fail("session control belongs to item references");
        }
        self
    }

    fn push(mut self, identifier: Identifier, kind: ControlKind, container: bool) -> Self {
        let Some(&parent) = self.open.last() else {
            self.fail("no open container");
            return self;
        };
        let parent_kind = &self.nodes[parent.0].kind;
        let allowed = match kind {
            ControlKind::TestPart { .. } => matches!(parent_kind, ControlKind::Test),
            _ => matches!(parent_kind, ControlKind::TestPart { .. } | ControlKind::Section),
        };
        if !allowed {
            let message = format!(
                "{} {identifier} cannot be placed in {} {}",
                kind.name(),
                parent_kind.name(),
                self.nodes[parent.0].identifier
            );
            self.fail(message);
            return self;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(ControlNode::new(identifier, kind, Some(parent)));
        self.nodes[parent.0].children.push(id);
        self.last = id;
        if container {
            self.open.push(id);
        }
        self
    }

    fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    /// Finishes the test, closing any open containers.
    ///
    /// # Errors
    /// Returns [`ErrorKind::InvalidStructure`] for misplaced nodes or
    /// attributes.
    pub fn build(mut self) -> Result<AssessmentTest> {
        if let Some(message) = self.error.take() {
            return Err(Error::new(ErrorKind::InvalidStructure(message)));
        }

        // Children always follow their parent, so one reverse pass sees
        // every child's extent before its parent's.
        for i in (0..self.nodes.len()).rev() {
            let end = self.nodes[i]
                .children
                .iter()
                .map(|c| self.nodes[c.0].subtree_end)
                .max()
                .unwrap_or(i + 1);
            self.nodes[i].subtree_end = end;
        }

        let mut index = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            index.entry(node.identifier.clone()).or_insert(NodeId(i));
        }

        Ok(AssessmentTest {
            nodes: self.nodes,
            index,
            declarations: Arc::new(self.declarations),
            outcome_processing: self.outcome_processing,
        })
    }
}
