//! Variable resolution scopes.
//!
//! An item scope resolves only local identifiers. A test scope also
//! resolves `itemRef.variable` references into the declarations of the
//! referenced item, in stages that each fail with their own error kind:
//!
//! 1. the item reference must exist ([`ErrorKind::UnknownItemRef`]);
//! 2. its item must be resolved ([`ErrorKind::ItemNotResolved`]);
//! 3. the identifier is mapped through the item reference's variable
//!    mappings (identity when unmapped);
//! 4. the mapped identifier must be declared by the item
//!    ([`ErrorKind::UndeclaredVariable`]).

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use qtiflow_foundation::{Error, ErrorKind, Identifier, Result, VariableRef};

use crate::declaration::{Declarations, VariableDeclaration};

/// Resolves variable references to declarations.
pub trait Scope {
    /// Resolves an unqualified identifier.
    fn resolve_local(&self, identifier: &Identifier) -> Option<&VariableDeclaration>;

    /// Resolves `item_ref.identifier`.
    ///
    /// # Errors
    /// Returns a stage-specific error when resolution fails.
    fn resolve_qualified(
        &self,
        item_ref: &Identifier,
        identifier: &Identifier,
    ) -> Result<&VariableDeclaration>;

    /// Resolves a reference of either form.
    ///
    /// # Errors
    /// Returns [`ErrorKind::UndeclaredVariable`] for an unknown local
    /// identifier, or the error of [`Scope::resolve_qualified`].
    fn resolve(&self, reference: &VariableRef) -> Result<&VariableDeclaration> {
        match &reference.item_ref {
            Some(item_ref) => self.resolve_qualified(item_ref, &reference.identifier),
            None => self
                .resolve_local(&reference.identifier)
                .ok_or_else(|| Error::undeclared(reference)),
        }
    }
}

impl Scope for Declarations {
    fn resolve_local(&self, identifier: &Identifier) -> Option<&VariableDeclaration> {
        self.get(identifier)
    }

    fn resolve_qualified(
        &self,
        item_ref: &Identifier,
        identifier: &Identifier,
    ) -> Result<&VariableDeclaration> {
        Err(Error::new(ErrorKind::QualifiedReference(format!(
            "{item_ref}.{identifier}"
        ))))
    }
}

/// Test-side to item-side variable renames of one item reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableMappings(im::HashMap<Identifier, Identifier>);

impl VariableMappings {
    /// Creates an empty mapping table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the test-side `source` to the item-side `target`.
    #[must_use]
    pub fn with(mut self, source: impl Into<Identifier>, target: impl Into<Identifier>) -> Self {
        self.insert(source.into(), target.into());
        self
    }

    /// Maps the test-side `source` to the item-side `target`.
    pub fn insert(&mut self, source: Identifier, target: Identifier) {
        self.0.insert(source, target);
    }

    /// Returns the item-side name for `source`.
    #[must_use]
    pub fn target_of<'a>(&'a self, source: &'a Identifier) -> &'a Identifier {
        self.0.get(source).unwrap_or(source)
    }

    /// Iterates over `(source, target)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &Identifier)> {
        self.0.iter()
    }

    /// Returns the number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no identifier is renamed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a test scope knows about one item reference.
#[derive(Clone, Debug, Default)]
pub struct ItemRefScope {
    /// Variable renames.
    pub mappings: VariableMappings,
    /// Declarations of the referenced item, when resolved.
    pub declarations: Option<Arc<Declarations>>,
}

/// Scope of test-level processing.
#[derive(Clone, Debug, Default)]
pub struct TestScope {
    declarations: Arc<Declarations>,
    item_refs: HashMap<Identifier, ItemRefScope>,
}

impl TestScope {
    /// Creates a scope over the test's own declarations.
    #[must_use]
    pub fn new(declarations: Arc<Declarations>) -> Self {
        Self {
            declarations,
            item_refs: HashMap::new(),
        }
    }

    /// Registers an item reference.
    #[must_use]
    pub fn with_item_ref(mut self, identifier: impl Into<Identifier>, item_ref: ItemRefScope) -> Self {
        self.add_item_ref(identifier.into(), item_ref);
        self
    }

    /// Registers an item reference.
    pub fn add_item_ref(&mut self, identifier: Identifier, item_ref: ItemRefScope) {
        self.item_refs.insert(identifier, item_ref);
    }

    /// Returns the test's own declarations.
    #[must_use]
    pub fn declarations(&self) -> &Arc<Declarations> {
        &self.declarations
    }

    /// Returns an item reference by identifier.
    #[must_use]
    pub fn item_ref(&self, identifier: &Identifier) -> Option<&ItemRefScope> {
        self.item_refs.get(identifier)
    }
}

impl Scope for TestScope {
    fn resolve_local(&self, identifier: &Identifier) -> Option<&VariableDeclaration> {
        self.declarations.get(identifier)
    }

    fn resolve_qualified(
        &self,
        item_ref: &Identifier,
        identifier: &Identifier,
    ) -> Result<&VariableDeclaration> {
        let scope = self
            .item_refs
            .get(item_ref)
            .ok_or_else(|| Error::new(ErrorKind::UnknownItemRef(item_ref.clone())))?;
        let declarations = scope
            .declarations
            .as_deref()
            .ok_or_else(|| Error::new(ErrorKind::ItemNotResolved(item_ref.clone())))?;
        let mapped = scope.mappings.target_of(identifier);
        declarations.get(mapped).ok_or_else(|| {
            Error::undeclared(&VariableRef::qualified(item_ref.clone(), mapped.clone()))
        })
    }
}
