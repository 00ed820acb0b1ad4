//! Production context and cycle detection.
//!
//! The cycle guard is a per-call-chain stack of in-flight keys, created
//! fresh for each public lookup and threaded explicitly through every
//! recursive step - producers only ever see it wrapped in a [`Production`]
//! context. Nothing here is shared between call chains, so concurrent
//! injectors (or future threading) cannot trip each other's detection.

use crate::bindings::key::Key;
use crate::core::{BinderyError, Result};
use crate::evaluator::{EvalContext, Expression};
use crate::injector::{Contribution, Injector};
use crate::types::{TypeShape, TypeSystem};
use serde_json::Value;

/// Stack of keys currently being produced on this call chain.
#[derive(Debug, Default)]
pub(crate) struct CycleGuard {
    stack: Vec<Key>,
}

impl CycleGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Push `key`, or fail when it is already in flight.
    pub(crate) fn enter(&mut self, key: &Key) -> Result<()> {
        if self.stack.contains(key) {
            return Err(BinderyError::LookupCycle {
                key: key.to_string(),
            });
        }
        self.stack.push(key.clone());
        Ok(())
    }

    /// Pop the most recent key.
    pub(crate) fn exit(&mut self) {
        self.stack.pop();
    }
}

/// Lookup access handed to producers during production.
///
/// Wraps the injector together with the call chain's cycle guard; every
/// nested lookup made through this context participates in cycle
/// detection.
pub struct Production<'a> {
    injector: &'a Injector,
    guard: &'a mut CycleGuard,
}

impl<'a> Production<'a> {
    pub(crate) fn new(injector: &'a Injector, guard: &'a mut CycleGuard) -> Self {
        Self { injector, guard }
    }

    /// Look up a `Data`-typed name.
    pub fn lookup(&mut self, name: &str) -> Result<Option<Value>> {
        let key = self.injector.data_key(name);
        self.lookup_key(&key)
    }

    /// Look up a type/name combination, type-checking the result against
    /// the requested type.
    pub fn lookup_type(&mut self, type_shape: &TypeShape, name: &str) -> Result<Option<Value>> {
        self.injector.lookup_type_guarded(type_shape, name, self.guard)
    }

    /// Look up a key.
    pub fn lookup_key(&mut self, key: &Key) -> Result<Option<Value>> {
        self.injector.lookup_key_guarded(key, self.guard)
    }

    /// Contributions to a multibind, descending precedence.
    #[must_use]
    pub fn get_contributions(&self, contributions_key: &Key) -> Vec<Contribution> {
        self.injector.get_contributions(contributions_key)
    }

    /// Evaluate an expression through the evaluator capability.
    pub fn evaluate(&self, expression: &Expression, context: &EvalContext) -> Result<Value> {
        self.injector.capabilities().evaluator.evaluate(expression, context)
    }

    /// The type system capability.
    #[must_use]
    pub fn type_system(&self) -> &dyn TypeSystem {
        self.injector.capabilities().type_system.as_ref()
    }

    /// The injector this production runs against.
    #[must_use]
    pub fn injector(&self) -> &Injector {
        self.injector
    }
}
