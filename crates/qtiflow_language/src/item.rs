//! Assessment items.

use std::sync::Arc;

use qtiflow_declaration::{Declarations, VariableDeclaration};
use qtiflow_foundation::Identifier;

use crate::path::NodePath;
use crate::rule::ProcessingTree;

/// A resolved assessment item: declarations plus response processing.
#[derive(Clone, Debug)]
pub struct AssessmentItem {
    /// Item identifier.
    pub identifier: Identifier,
    /// Declarations, seeded with the item built-ins.
    pub declarations: Arc<Declarations>,
    /// Response processing, if any.
    pub response_processing: Option<ProcessingTree>,
}

impl AssessmentItem {
    /// Creates an item with only the built-in declarations.
    #[must_use]
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            identifier: identifier.into(),
            declarations: Arc::new(Declarations::item()),
            response_processing: None,
        }
    }

    /// Adds a declaration.
    #[must_use]
    pub fn with_declaration(mut self, declaration: VariableDeclaration) -> Self {
        Arc::make_mut(&mut self.declarations).declare(declaration);
        self
    }

    /// Sets response processing.
    #[must_use]
    pub fn with_response_processing(mut self, processing: ProcessingTree) -> Self {
        self.response_processing = Some(processing);
        self
    }

    /// Returns the path of this item when validated on its own.
    #[must_use]
    pub fn path(&self) -> NodePath {
        NodePath::root_named("assessmentItem", &self.identifier)
    }

    /// Wraps the item for sharing between tests and sessions.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
