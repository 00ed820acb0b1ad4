//! Bundled external capabilities.
//!
//! The engine consumes three collaborator interfaces: a type system, an
//! expression evaluator, and the instantiable registry. They are supplied
//! together at binder construction and shared (never rebuilt) by child
//! injectors created through overrides.

use crate::evaluator::{Evaluator, NullEvaluator};
use crate::registry::InstantiableRegistry;
use crate::types::{StructuralTypeSystem, TypeSystem};
use std::fmt;
use std::sync::Arc;

/// The capability bundle handed to [`Binder::new`](crate::binder::Binder::new).
#[derive(Clone)]
pub struct Capabilities {
    /// Type reasoning used for key collapsing and value checks.
    pub type_system: Arc<dyn TypeSystem>,
    /// Expression evaluation for evaluating producers and transformers.
    pub evaluator: Arc<dyn Evaluator>,
    /// Named construction capabilities.
    pub registry: Arc<InstantiableRegistry>,
}

impl Capabilities {
    /// Bundle explicit capability implementations.
    pub fn new(
        type_system: Arc<dyn TypeSystem>,
        evaluator: Arc<dyn Evaluator>,
        registry: Arc<InstantiableRegistry>,
    ) -> Self {
        Self {
            type_system,
            evaluator,
            registry,
        }
    }

    /// Structural type checking, no evaluator, empty registry.
    ///
    /// Sufficient for bindings built from constants, lookups, and
    /// multibinds.
    #[must_use]
    pub fn structural() -> Self {
        Self::new(
            Arc::new(StructuralTypeSystem::new()),
            Arc::new(NullEvaluator),
            Arc::new(InstantiableRegistry::new()),
        )
    }

    /// Replace the registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<InstantiableRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the evaluator.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Replace the type system.
    #[must_use]
    pub fn with_type_system(mut self, type_system: Arc<dyn TypeSystem>) -> Self {
        self.type_system = type_system;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::structural()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
