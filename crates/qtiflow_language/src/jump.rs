//! Branch-rule jump legality.
//!
//! Jumps only move forward. From node N, a target T is legal when T is N
//! itself (a no-op), or T follows N in document order and is not inside
//! N's subtree. A test part may only jump to another test part. Special
//! targets exit an enclosing container, whose own branch rules still run.

use thiserror::Error;

use qtiflow_foundation::{Error as QtiError, Identifier};

use crate::control::{AssessmentTest, BranchTarget, NodeId};

/// Where a legal jump continues.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JumpDestination {
    /// The target is the source; continue as if no rule matched.
    Stay,
    /// Continue by entering this node.
    Enter(NodeId),
    /// Continue at the exit of this container.
    Exit(NodeId),
}

/// Why a jump is illegal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum JumpViolation {
    /// No node has the target identifier.
    #[error("cannot find target {0}")]
    UnknownTarget(Identifier),
    /// The target precedes the source, ancestors included.
    #[error("cannot jump back to {0}")]
    Backward(Identifier),
    /// The target is inside the source's subtree.
    #[error("cannot jump to own descendant {0}")]
    IntoSubtree(Identifier),
    /// A test part targets something other than a test part.
    #[error("cannot jump from a test part to {kind} {target}")]
    PartToNonPart {
        /// Target identifier.
        target: Identifier,
        /// Element name of the target.
        kind: &'static str,
    },
    /// A special target that does not apply to the source.
    #[error("invalid special target {0}")]
    InvalidSpecialTarget(BranchTarget),
    /// The test root has nowhere to jump.
    #[error("the test itself cannot branch")]
    FromTest,
}

impl JumpViolation {
    /// Returns true when the target simply does not exist.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::UnknownTarget(_))
    }

    /// Converts this violation into the fatal runtime error.
    #[must_use]
    pub fn into_error(self, source: &Identifier, target: &BranchTarget) -> QtiError {
        QtiError::illegal_jump(source.clone(), target.identifier(), self.to_string())
    }
}

/// Checks a jump from `source` to `target`.
///
/// # Errors
/// Returns the [`JumpViolation`] that makes the jump illegal.
pub fn check_jump(
    test: &AssessmentTest,
    source: NodeId,
    target: &BranchTarget,
) -> Result<JumpDestination, JumpViolation> {
    if source == test.root() {
        return Err(JumpViolation::FromTest);
    }
    let source_node = test.node(source);

    match target {
        BranchTarget::ExitTest => Ok(JumpDestination::Exit(test.root())),
        BranchTarget::ExitTestPart => {
            if source_node.is_test_part() {
                return Err(JumpViolation::InvalidSpecialTarget(target.clone()));
            }
            test.test_part_of(source)
                .map(JumpDestination::Exit)
                .ok_or_else(|| JumpViolation::InvalidSpecialTarget(target.clone()))
        }
        BranchTarget::ExitSection => {
            let parent = source_node
                .parent
                .filter(|&p| !source_node.is_test_part() && !test.node(p).is_test_part())
                .ok_or_else(|| JumpViolation::InvalidSpecialTarget(target.clone()))?;
            Ok(JumpDestination::Exit(parent))
        }
        BranchTarget::Node(identifier) => {
            let destination = test
                .find(identifier)
                .ok_or_else(|| JumpViolation::UnknownTarget(identifier.clone()))?;
            let destination_node = test.node(destination);
            if destination == source {
                Ok(JumpDestination::Stay)
            } else if source_node.is_test_part() && !destination_node.is_test_part() {
                Err(JumpViolation::PartToNonPart {
                    target: identifier.clone(),
                    kind: destination_node.kind.name(),
                })
            } else if destination < source {
                Err(JumpViolation::Backward(identifier.clone()))
            } else if test.is_descendant(destination, source) {
                Err(JumpViolation::IntoSubtree(identifier.clone()))
            } else {
                Ok(JumpDestination::Enter(destination))
            }
        }
    }
}
