//! Processing contexts: the mutable variable bindings of one session.
//!
//! A context binds every declared identifier to its current value and owns
//! the session's random generator. Values live in persistent maps, so a
//! snapshot is a cheap clone and restoring one undoes every assignment made
//! since.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use qtiflow_declaration::{Declarations, Scope, TestScope};
use qtiflow_foundation::{Error, ErrorKind, Identifier, Result, Value, VariableRef};
use qtiflow_language::{AssessmentItem, AssessmentTest};

// =============================================================================
// Processing Context
// =============================================================================

/// Variable access for rule and expression evaluation.
pub trait ProcessingContext {
    /// Saved state restored after a fatal error.
    type Snapshot;

    /// Returns the scope references are resolved in.
    fn scope(&self) -> &dyn Scope;

    /// Reads a variable.
    ///
    /// # Errors
    /// Returns the scope's resolution error for undeclared variables.
    fn value(&self, reference: &VariableRef) -> Result<Value>;

    /// Assigns a local variable, coercing the value to its signature.
    ///
    /// # Errors
    /// Returns an error if the variable is undeclared or the value does not
    /// fit its signature.
    fn set_value(&mut self, identifier: &Identifier, value: Value) -> Result<()>;

    /// Returns the session's random generator.
    fn rng(&mut self) -> &mut ChaCha8Rng;

    /// Saves the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Restores a saved state.
    fn restore(&mut self, snapshot: Self::Snapshot);
}

fn bootstrap(declarations: &Declarations) -> im::HashMap<Identifier, Value> {
    declarations
        .iter()
        .map(|d| (d.identifier.clone(), d.initial_value()))
        .collect()
}

fn assign(
    declarations: &Declarations,
    values: &mut im::HashMap<Identifier, Value>,
    identifier: &Identifier,
    value: &Value,
) -> Result<()> {
    let declaration = declarations
        .get(identifier)
        .ok_or_else(|| Error::undeclared(&VariableRef::local(identifier.clone())))?;
    let value = value.coerce_to(declaration.signature)?;
    values.insert(identifier.clone(), value);
    Ok(())
}

// =============================================================================
// Item Session
// =============================================================================

/// Variables of one item session.
#[derive(Clone, Debug)]
pub struct ItemSessionContext {
    declarations: Arc<Declarations>,
    values: im::HashMap<Identifier, Value>,
    rng: ChaCha8Rng,
}

/// Saved state of an [`ItemSessionContext`].
#[derive(Clone, Debug)]
pub struct ItemSnapshot {
    values: im::HashMap<Identifier, Value>,
    rng: ChaCha8Rng,
}

impl ItemSessionContext {
    /// Creates a session with every variable at its default.
    #[must_use]
    pub fn new(declarations: Arc<Declarations>, seed: u64) -> Self {
        let values = bootstrap(&declarations);
        Self {
            declarations,
            values,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a session for `item`.
    #[must_use]
    pub fn for_item(item: &AssessmentItem, seed: u64) -> Self {
        Self::new(Arc::clone(&item.declarations), seed)
    }

    /// Returns the declarations of this session.
    #[must_use]
    pub fn declarations(&self) -> &Arc<Declarations> {
        &self.declarations
    }

    /// Returns the value of a local variable, NULL when undeclared.
    #[must_use]
    pub fn get(&self, identifier: &Identifier) -> Value {
        self.values.get(identifier).cloned().unwrap_or_default()
    }

    /// Resets every variable to its default.
    pub fn reset(&mut self) {
        self.values = bootstrap(&self.declarations);
    }
}

impl ProcessingContext for ItemSessionContext {
    type Snapshot = ItemSnapshot;

    fn scope(&self) -> &dyn Scope {
        &*self.declarations
    }

    fn value(&self, reference: &VariableRef) -> Result<Value> {
        let declaration = self.declarations.resolve(reference)?;
        Ok(self.get(&declaration.identifier))
    }

    fn set_value(&mut self, identifier: &Identifier, value: Value) -> Result<()> {
        assign(&self.declarations, &mut self.values, identifier, &value)
    }

    fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            values: self.values.clone(),
            rng: self.rng.clone(),
        }
    }

    fn restore(&mut self, snapshot: ItemSnapshot) {
        self.values = snapshot.values;
        self.rng = snapshot.rng;
    }
}

// =============================================================================
// Test Session
// =============================================================================

/// Variables of one test session: the test's own variables plus one item
/// session per resolved item reference.
#[derive(Clone, Debug)]
pub struct TestSessionContext {
    test: Arc<AssessmentTest>,
    scope: TestScope,
    values: im::HashMap<Identifier, Value>,
    items: im::HashMap<Identifier, ItemSessionContext>,
    rng: ChaCha8Rng,
}

/// Saved state of a [`TestSessionContext`].
#[derive(Clone, Debug)]
pub struct TestSnapshot {
    values: im::HashMap<Identifier, Value>,
    items: im::HashMap<Identifier, ItemSessionContext>,
    rng: ChaCha8Rng,
}

impl TestSessionContext {
    /// Creates a session for `test` with every variable at its default.
    ///
    /// Each item session gets its own generator, derived from `seed` and
    /// the item reference's position.
    #[must_use]
    pub fn new(test: Arc<AssessmentTest>, seed: u64) -> Self {
        let mut items = im::HashMap::new();
        for id in test.item_refs() {
            let node = test.node(id);
            if let Some(item) = node.item() {
                let item_seed = seed.wrapping_add(id.index() as u64);
                items.insert(
                    node.identifier.clone(),
                    ItemSessionContext::for_item(item, item_seed),
                );
            }
        }
        Self {
            scope: test.scope(),
            values: bootstrap(test.declarations()),
            items,
            rng: ChaCha8Rng::seed_from_u64(seed),
            test,
        }
    }

    /// Returns the test.
    #[must_use]
    pub fn test(&self) -> &Arc<AssessmentTest> {
        &self.test
    }

    /// Returns the value of a test-level variable, NULL when undeclared.
    #[must_use]
    pub fn get(&self, identifier: &Identifier) -> Value {
        self.values.get(identifier).cloned().unwrap_or_default()
    }

    /// Returns the session of an item reference.
    #[must_use]
    pub fn item(&self, item_ref: &Identifier) -> Option<&ItemSessionContext> {
        self.items.get(item_ref)
    }

    /// Returns the session of an item reference for modification.
    ///
    /// # Errors
    /// Returns [`ErrorKind::UnknownItemRef`] or [`ErrorKind::ItemNotResolved`].
    pub fn item_mut(&mut self, item_ref: &Identifier) -> Result<&mut ItemSessionContext> {
        if self.items.contains_key(item_ref) {
            return self
                .items
                .get_mut(item_ref)
                .ok_or_else(|| Error::new(ErrorKind::Internal(format!("lost {item_ref}"))));
        }
        match self.scope.item_ref(item_ref) {
            Some(_) => Err(Error::new(ErrorKind::ItemNotResolved(item_ref.clone()))),
            None => Err(Error::new(ErrorKind::UnknownItemRef(item_ref.clone()))),
        }
    }
}

impl ProcessingContext for TestSessionContext {
    type Snapshot = TestSnapshot;

    fn scope(&self) -> &dyn Scope {
        &self.scope
    }

    fn value(&self, reference: &VariableRef) -> Result<Value> {
        let declaration = self.scope.resolve(reference)?;
        match &reference.item_ref {
            None => Ok(self.get(&declaration.identifier)),
            Some(item_ref) => Ok(self
                .items
                .get(item_ref)
                .map(|session| session.get(&declaration.identifier))
                .unwrap_or_default()),
        }
    }

    fn set_value(&mut self, identifier: &Identifier, value: Value) -> Result<()> {
        assign(self.test.declarations(), &mut self.values, identifier, &value)
    }

    fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    fn snapshot(&self) -> TestSnapshot {
        TestSnapshot {
            values: self.values.clone(),
            items: self.items.clone(),
            rng: self.rng.clone(),
        }
    }

    fn restore(&mut self, snapshot: TestSnapshot) {
        self.values = snapshot.values;
        self.items = snapshot.items;
        self.rng = snapshot.rng;
    }
}
