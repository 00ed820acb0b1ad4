//! Registry of host-provided construction capabilities.
//!
//! The engine never reflects over host types. Anything a binding wants
//! constructed by name - instance producers, assisted injection, custom
//! producer implementations - must be registered here first. The registry is
//! an explicit object passed into the binder/injector construction path; its
//! lifecycle is tied to one configuration pass, and there is no ambient
//! global state.

use crate::bindings::ProducerArg;
use crate::core::{BinderyError, Result};
use crate::injector::Production;
use crate::producers::Producer;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Capability interface for constructing host values by name.
///
/// `try_injection_hook` is consulted first; returning `Ok(None)` means the
/// type has no hook and `default_construct` is used instead. Hooks receive a
/// [`Production`] context and may perform lookups through it (subject to the
/// caller's cycle guard).
pub trait Instantiable {
    /// Construct via the type's injection hook, or report that none exists.
    fn try_injection_hook(
        &self,
        production: &mut Production<'_>,
        args: &[ProducerArg],
    ) -> Result<Option<Value>> {
        let _ = (production, args);
        Ok(None)
    }

    /// Construct via the type's plain constructor.
    fn default_construct(&self, args: &[ProducerArg]) -> Result<Value>;
}

impl std::fmt::Debug for dyn Instantiable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Instantiable")
    }
}

/// Capability interface for creating custom producer instances.
///
/// Used by producer-of-producer descriptors: each `create` call must return
/// a fresh producer with fresh internal state, so a restarted series starts
/// over.
pub trait ProducerFactory {
    /// Create a new producer instance.
    fn create(&self, args: &[ProducerArg]) -> Result<Arc<dyn Producer>>;
}

/// Capability interface for diagnostics collection.
///
/// Consumed by validation passes layered on top of the engine; the engine
/// itself raises structured errors and never calls the sink directly.
pub trait DiagnosticsSink {
    /// Report an issue discovered about `subject`.
    fn accept(&self, issue_code: &str, subject: &str, details: &str);
}

/// [`DiagnosticsSink`] forwarding to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticsSink;

impl DiagnosticsSink for TracingDiagnosticsSink {
    fn accept(&self, issue_code: &str, subject: &str, details: &str) {
        tracing::warn!(issue_code, subject, details, "diagnostic issue");
    }
}

/// Minimum similarity for "did you mean" suggestions.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Name-keyed registry of [`Instantiable`]s and [`ProducerFactory`]s.
#[derive(Default)]
pub struct InstantiableRegistry {
    instantiables: BTreeMap<String, Arc<dyn Instantiable>>,
    producer_factories: BTreeMap<String, Arc<dyn ProducerFactory>>,
}

impl InstantiableRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instantiable under `name`, replacing any previous entry.
    pub fn register_instantiable(
        &mut self,
        name: impl Into<String>,
        instantiable: Arc<dyn Instantiable>,
    ) {
        self.instantiables.insert(name.into(), instantiable);
    }

    /// Register a producer factory under `name`, replacing any previous entry.
    pub fn register_producer_factory(
        &mut self,
        name: impl Into<String>,
        factory: Arc<dyn ProducerFactory>,
    ) {
        self.producer_factories.insert(name.into(), factory);
    }

    /// The instantiable registered under `name`, if any.
    #[must_use]
    pub fn find_instantiable(&self, name: &str) -> Option<Arc<dyn Instantiable>> {
        self.instantiables.get(name).cloned()
    }

    /// The instantiable registered under `name`, or an error with a
    /// closest-name suggestion.
    pub fn instantiable(&self, name: &str) -> Result<Arc<dyn Instantiable>> {
        self.find_instantiable(name)
            .ok_or_else(|| BinderyError::UnknownRegistryEntry {
                kind: "class",
                name: name.to_string(),
                suggestion: closest_name(self.instantiables.keys(), name),
            })
    }

    /// The producer factory registered under `name`, or an error with a
    /// closest-name suggestion.
    pub fn producer_factory(&self, name: &str) -> Result<Arc<dyn ProducerFactory>> {
        self.producer_factories.get(name).cloned().ok_or_else(|| {
            BinderyError::UnknownRegistryEntry {
                kind: "producer",
                name: name.to_string(),
                suggestion: closest_name(self.producer_factories.keys(), name),
            }
        })
    }

    /// Registered instantiable names, sorted.
    #[must_use]
    pub fn instantiable_names(&self) -> Vec<&str> {
        self.instantiables.keys().map(String::as_str).collect()
    }

    /// Registered producer factory names, sorted.
    #[must_use]
    pub fn producer_factory_names(&self) -> Vec<&str> {
        self.producer_factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for InstantiableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstantiableRegistry")
            .field("instantiables", &self.instantiable_names())
            .field("producer_factories", &self.producer_factory_names())
            .finish()
    }
}

/// The registered name most similar to `name`, if similar enough to suggest.
fn closest_name<'a>(
    candidates: impl Iterator<Item = &'a String>,
    name: &str,
) -> Option<String> {
    candidates
        .map(|candidate| (strsim::jaro_winkler(candidate, name), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, candidate)| candidate.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed;

    impl Instantiable for Fixed {
        fn default_construct(&self, _args: &[ProducerArg]) -> Result<Value> {
            Ok(json!({"fixed": true}))
        }
    }

    #[test]
    fn unknown_names_get_a_suggestion() {
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable("Widget", Arc::new(Fixed));

        let err = registry.instantiable("Wdget").unwrap_err();
        let BinderyError::UnknownRegistryEntry { suggestion, .. } = err else {
            panic!("expected registry error");
        };
        assert_eq!(suggestion.as_deref(), Some("Widget"));
    }

    #[test]
    fn dissimilar_names_get_no_suggestion() {
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable("Widget", Arc::new(Fixed));

        let err = registry.instantiable("zzzzz").unwrap_err();
        let BinderyError::UnknownRegistryEntry { suggestion, .. } = err else {
            panic!("expected registry error");
        };
        assert_eq!(suggestion, None);
    }

    #[test]
    fn registered_instantiables_are_found() {
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable("Widget", Arc::new(Fixed));

        assert!(registry.find_instantiable("Widget").is_some());
        assert_eq!(registry.instantiable_names(), vec!["Widget"]);
    }
}
