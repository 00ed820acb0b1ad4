//! The lookup service over a configured binder.
//!
//! An injector takes ownership of the binder's merged entries and serves
//! value and producer lookups against them. Producers are materialized
//! lazily: the first lookup of a key transforms its binding's producer
//! descriptor into a live producer, memoizes it on the entry, and every
//! later lookup reuses it. Whether a producer caches its value (singleton)
//! or produces fresh on each call is decided during the transform - a
//! descriptor is a singleton unless its immediate container is a
//! non-caching wrapper.
//!
//! Lookups that find nothing return `None`; only structural and type
//! violations raise. Each public lookup runs under a fresh cycle guard
//! threaded through every recursive production, so self-referential
//! bindings fail fast instead of looping.
//!
//! An injector is single-threaded by contract: lookups execute
//! synchronously on the calling thread and the entry cache is not
//! synchronized. Use one injector per thread, or wrap access externally.
//!
//! # Example
//!
//! ```
//! use bindery::binder::Binder;
//! use bindery::bindings::BindingsFactory;
//! use bindery::capabilities::Capabilities;
//! use bindery::config::EngineConfig;
//! use bindery::injector::Injector;
//! use serde_json::json;
//!
//! let mut bindings = BindingsFactory::named_bindings("defaults");
//! bindings.bind().name("answer").integer().to(42);
//! let layered = BindingsFactory::layered_bindings(vec![BindingsFactory::layer(
//!     "base",
//!     vec![bindings.build()],
//! )]);
//!
//! let mut binder = Binder::new(EngineConfig::default(), Capabilities::structural());
//! binder.set_categories(&BindingsFactory::categories(&[])).unwrap();
//! binder.set_layers(&layered).unwrap();
//!
//! let injector = Injector::new(binder).unwrap();
//! assert_eq!(injector.lookup("answer").unwrap(), Some(json!(42)));
//! ```

use crate::binder::{Binder, BindingOrigin, Precedence};
use crate::bindings::key::{Key, KeyFactory};
use crate::bindings::{
    ArrayMultibindOptions, Binding, EffectiveCategories, HashMultibindOptions, LayeredBindings,
    NamedBindingsBuilder, NamedLayer, ProducerDescriptor, ProducerKind,
};
use crate::bindings::factory::BindingsFactory;
use crate::capabilities::Capabilities;
use crate::config::EngineConfig;
use crate::core::{BinderyError, Result};
use crate::producers::{
    ArrayMultibindProducer, AssistedInjectProducer, DeepCloningProducer, EvaluatingProducer,
    FirstFoundProducer, HashLookupProducer, HashMultibindProducer, InstantiatingProducer,
    LookupProducer, Producer, ProducerProducer, SingletonProducer, SingletonProducerProducer,
    TransformingProducer,
};
use crate::types::TypeShape;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

mod entry;
mod production;

#[cfg(test)]
mod injector_tests;

pub use entry::InjectorEntry;
pub use production::Production;

pub(crate) use entry::EntryCell;
pub(crate) use production::CycleGuard;

/// Origin recorded on entries synthesized for assisted injection.
const ASSISTED_ORIGIN: &str = "assisted-inject";

/// Layer name used for bindings added through an override injector.
const OVERRIDE_LAYER: &str = "override";

/// One contribution to a multibind, as returned by
/// [`Injector::get_contributions`].
#[derive(Debug, Clone)]
pub struct Contribution {
    /// Entry key of the contribution
    pub key: Key,
    /// The contributing binding
    pub binding: Arc<Binding>,
    /// Effective precedence the contribution resolved at
    pub precedence: Precedence,
}

/// Serves lookups against a configured [`Binder`].
pub struct Injector {
    entries: RefCell<BTreeMap<Key, EntryCell>>,
    contributions: BTreeMap<Key, Vec<Key>>,
    key_factory: KeyFactory,
    capabilities: Capabilities,
    config: EngineConfig,
    categories: EffectiveCategories,
    parent: Option<Arc<Injector>>,
}

impl Injector {
    /// Create an injector over a configured binder.
    ///
    /// # Errors
    ///
    /// [`BinderyError::Configuration`] when the binder has not completed
    /// both configuration steps.
    pub fn new(binder: Binder) -> Result<Arc<Self>> {
        Self::build(binder, None)
    }

    fn build(binder: Binder, parent: Option<Arc<Injector>>) -> Result<Arc<Self>> {
        let (config, capabilities, key_factory, categories, resolved) = binder.into_parts();
        let Some(resolved) = resolved else {
            return Err(BinderyError::Configuration {
                message: "the given binder is not configured".to_string(),
            });
        };
        let entries = resolved
            .entries
            .into_iter()
            .map(|(key, entry)| (key, EntryCell::Bound(entry.into())))
            .collect();
        Ok(Arc::new(Self {
            entries: RefCell::new(entries),
            contributions: resolved.contributions,
            key_factory,
            capabilities,
            config,
            categories: categories.unwrap_or_default(),
            parent,
        }))
    }

    /// The capability bundle this injector resolves through.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The key factory shared with the binder.
    ///
    /// Keys must be built through this factory so type collapsing matches
    /// the merge.
    #[must_use]
    pub fn key_factory(&self) -> &KeyFactory {
        &self.key_factory
    }

    /// Key for a type/name combination.
    #[must_use]
    pub fn named_key(&self, type_shape: TypeShape, name: &str) -> Key {
        self.key_factory.named_key(type_shape, name)
    }

    /// Key for a `Data`-typed name.
    #[must_use]
    pub fn data_key(&self, name: &str) -> Key {
        self.key_factory.data_key(name)
    }

    /// Look up the value bound to a `Data`-typed name.
    pub fn lookup(&self, name: &str) -> Result<Option<Value>> {
        self.lookup_key(&self.data_key(name))
    }

    /// Look up a type/name combination.
    ///
    /// The produced value is checked against the requested type as well as
    /// the binding's declared type, guarding callers that request a
    /// narrower type than what is bound.
    pub fn lookup_type(&self, type_shape: &TypeShape, name: &str) -> Result<Option<Value>> {
        let mut guard = CycleGuard::new();
        self.lookup_type_guarded(type_shape, name, &mut guard)
    }

    /// Look up a key.
    pub fn lookup_key(&self, key: &Key) -> Result<Option<Value>> {
        let mut guard = CycleGuard::new();
        self.lookup_key_guarded(key, &mut guard)
    }

    /// Look up the producer bound to a `Data`-typed name.
    pub fn lookup_producer(&self, name: &str) -> Result<Option<Arc<dyn Producer>>> {
        self.lookup_producer_key(&self.data_key(name))
    }

    /// Look up the producer for a type/name combination.
    ///
    /// The result is not type checked; it cannot be until the producer has
    /// produced an instance.
    pub fn lookup_producer_type(
        &self,
        type_shape: &TypeShape,
        name: &str,
    ) -> Result<Option<Arc<dyn Producer>>> {
        self.lookup_producer_key(&self.named_key(type_shape.clone(), name))
    }

    /// Look up the producer for a key.
    pub fn lookup_producer_key(&self, key: &Key) -> Result<Option<Arc<dyn Producer>>> {
        let mut guard = CycleGuard::new();
        guard.enter(key)?;
        let result = self.lookup_producer_inner(key, &mut guard);
        guard.exit();
        result
    }

    /// Contributions made to a multibind, in descending precedence order.
    ///
    /// Ties keep declaration order (higher layers first), so the result is
    /// deterministic for identical inputs.
    #[must_use]
    pub fn get_contributions(&self, contributions_key: &Key) -> Vec<Contribution> {
        let Some(keys) = self.contributions.get(contributions_key) else {
            return Vec::new();
        };
        let entries = self.entries.borrow();
        let mut result: Vec<Contribution> = keys
            .iter()
            .filter_map(|key| match entries.get(key) {
                Some(EntryCell::Bound(entry)) => Some(Contribution {
                    key: key.clone(),
                    binding: Arc::clone(&entry.binding),
                    precedence: entry.precedence.clone(),
                }),
                _ => None,
            })
            .collect();
        result.sort_by(|a, b| b.precedence.cmp(&a.precedence));
        result
    }

    /// Create a child injector overriding this one.
    ///
    /// The block details a named bindings group; its bindings shadow this
    /// injector's entries, and anything not overridden is delegated to this
    /// injector unchanged. The child shares this injector's capabilities
    /// and categories and never mutates its parent.
    pub fn override_with(
        self: &Arc<Self>,
        name: &str,
        build: impl FnOnce(&mut NamedBindingsBuilder),
    ) -> Result<Arc<Injector>> {
        let mut builder = BindingsFactory::named_bindings(name);
        build(&mut builder);
        let layered = LayeredBindings {
            layers: vec![NamedLayer {
                name: OVERRIDE_LAYER.to_string(),
                bindings: vec![builder.build()],
            }],
        };
        let mut binder = Binder::new(self.config.clone(), self.capabilities.clone());
        binder.set_categories(&self.categories)?;
        binder.set_layers(&layered)?;
        Self::build(binder, Some(Arc::clone(self)))
    }

    // ------------------------------------------------------------------
    // Guarded lookup internals
    // ------------------------------------------------------------------

    pub(crate) fn lookup_key_guarded(
        &self,
        key: &Key,
        guard: &mut CycleGuard,
    ) -> Result<Option<Value>> {
        guard.enter(key)?;
        let result = self.lookup_key_inner(key, guard);
        guard.exit();
        result
    }

    pub(crate) fn lookup_type_guarded(
        &self,
        type_shape: &TypeShape,
        name: &str,
        guard: &mut CycleGuard,
    ) -> Result<Option<Value>> {
        let key = self.named_key(type_shape.clone(), name);
        let value = self.lookup_key_guarded(&key, guard)?;
        if let Some(value) = &value {
            let type_system = &self.capabilities.type_system;
            if !type_system.instance_of(type_shape, value) {
                return Err(BinderyError::TypeMismatch {
                    subject: format!("requested type at key '{key}'"),
                    expected: type_shape.to_string(),
                    actual: type_system.infer(value).to_string(),
                });
            }
        }
        Ok(value)
    }

    fn lookup_key_inner(&self, key: &Key, guard: &mut CycleGuard) -> Result<Option<Value>> {
        trace!(key = %key, "lookup");
        match self.probe(key) {
            Probe::NotFound => Ok(None),
            Probe::Missing => {
                if let Some(parent) = &self.parent {
                    return parent.lookup_key_inner(key, guard);
                }
                self.assisted_inject(key, guard)
            }
            Probe::Bound { binding, cached } => {
                let producer = match cached {
                    Some(producer) => producer,
                    None => self.materialize_producer(key, &binding, guard)?,
                };
                let value = {
                    let mut production = Production::new(self, guard);
                    producer.produce(&mut production)?
                };
                self.check_binding_type(&binding, value)
            }
        }
    }

    fn lookup_producer_inner(
        &self,
        key: &Key,
        guard: &mut CycleGuard,
    ) -> Result<Option<Arc<dyn Producer>>> {
        match self.probe(key) {
            Probe::NotFound => Ok(None),
            Probe::Missing => {
                if let Some(parent) = &self.parent {
                    return parent.lookup_producer_inner(key, guard);
                }
                match self.assisted_producer(key)? {
                    Some(producer) => {
                        let mut production = Production::new(self, guard);
                        producer.on_producer_request(&mut production)?;
                        Ok(Some(producer))
                    }
                    None => Ok(None),
                }
            }
            Probe::Bound { binding, cached } => {
                let producer = match cached {
                    Some(producer) => producer,
                    None => self.materialize_producer(key, &binding, guard)?,
                };
                let mut production = Production::new(self, guard);
                producer.on_producer_request(&mut production)?;
                Ok(Some(producer))
            }
        }
    }

    fn probe(&self, key: &Key) -> Probe {
        let entries = self.entries.borrow();
        match entries.get(key) {
            None => Probe::Missing,
            Some(EntryCell::NotFound) => Probe::NotFound,
            Some(EntryCell::Bound(entry)) => Probe::Bound {
                binding: Arc::clone(&entry.binding),
                cached: entry.cached_producer.clone(),
            },
        }
    }

    fn mark_not_found(&self, key: &Key) {
        self.entries.borrow_mut().insert(key.clone(), EntryCell::NotFound);
    }

    /// Attempt assisted injection for an unbound key, producing the value.
    fn assisted_inject(&self, key: &Key, guard: &mut CycleGuard) -> Result<Option<Value>> {
        let Some(producer) = self.assisted_producer(key)? else {
            return Ok(None);
        };
        let binding = match self.probe(key) {
            Probe::Bound { binding, .. } => binding,
            _ => return Ok(None),
        };
        let value = {
            let mut production = Production::new(self, guard);
            producer.produce(&mut production)?
        };
        self.check_binding_type(&binding, value)
    }

    /// Create and cache the assisted-inject producer for an unbound class
    /// key, or cache a not-found marker.
    fn assisted_producer(&self, key: &Key) -> Result<Option<Arc<dyn Producer>>> {
        let Key::Named {
            type_shape: TypeShape::Class(class_name),
            name,
        } = key
        else {
            self.mark_not_found(key);
            return Ok(None);
        };
        if !name.is_empty() {
            self.mark_not_found(key);
            return Ok(None);
        }
        let Some(instantiable) = self.capabilities.registry.find_instantiable(class_name) else {
            self.mark_not_found(key);
            return Ok(None);
        };

        debug!(class = %class_name, "assisted injection");
        let producer: Arc<dyn Producer> = Arc::new(AssistedInjectProducer::new(instantiable));
        let binding = Arc::new(Binding {
            type_shape: TypeShape::Class(class_name.clone()),
            ..Binding::default()
        });
        let entry = InjectorEntry {
            precedence: Precedence::common(),
            binding,
            resolved: true,
            origin: BindingOrigin {
                layer: ASSISTED_ORIGIN.to_string(),
                bindings: ASSISTED_ORIGIN.to_string(),
            },
            cached_producer: Some(Arc::clone(&producer)),
        };
        self.entries.borrow_mut().insert(key.clone(), EntryCell::Bound(entry));
        Ok(Some(producer))
    }

    /// Normalize null results and check the binding's declared type.
    fn check_binding_type(
        &self,
        binding: &Binding,
        value: Option<Value>,
    ) -> Result<Option<Value>> {
        let value = value.filter(|v| !v.is_null());
        if let Some(value) = &value {
            let type_system = &self.capabilities.type_system;
            if !type_system.instance_of(&binding.type_shape, value) {
                return Err(BinderyError::TypeMismatch {
                    subject: format!("binding '{}/{}'", binding.type_shape, binding.name),
                    expected: binding.type_shape.to_string(),
                    actual: type_system.infer(value).to_string(),
                });
            }
        }
        Ok(value)
    }

    /// Transform the entry's descriptor and memoize the result.
    fn materialize_producer(
        &self,
        key: &Key,
        binding: &Arc<Binding>,
        guard: &mut CycleGuard,
    ) -> Result<Arc<dyn Producer>> {
        let producer = self.producer_for_binding(key, binding, guard)?;
        let mut entries = self.entries.borrow_mut();
        if let Some(EntryCell::Bound(entry)) = entries.get_mut(key) {
            entry.cached_producer = Some(Arc::clone(&producer));
        }
        Ok(producer)
    }

    fn producer_for_binding(
        &self,
        key: &Key,
        binding: &Arc<Binding>,
        guard: &mut CycleGuard,
    ) -> Result<Arc<dyn Producer>> {
        match &binding.producer {
            Some(descriptor) => self.transform(descriptor, true, binding, guard),
            None if binding.multibind.is_some() => self.auto_select_multibind(binding),
            None => Err(BinderyError::MissingProducer {
                key: key.to_string(),
            }),
        }
    }

    /// A multibinding without a producer selects its aggregator from the
    /// declared type.
    fn auto_select_multibind(&self, binding: &Arc<Binding>) -> Result<Arc<dyn Producer>> {
        match &binding.type_shape {
            TypeShape::Array(_) => Ok(Arc::new(ArrayMultibindProducer::new(
                binding,
                ArrayMultibindOptions::default(),
            )?)),
            TypeShape::Hash(..) => Ok(Arc::new(HashMultibindProducer::new(
                binding,
                HashMultibindOptions::default(),
            )?)),
            other => Err(BinderyError::UnsupportedMultibindType {
                name: binding.name.clone(),
                type_shape: other.to_string(),
            }),
        }
    }

    /// Transform a descriptor into a live producer.
    ///
    /// `singleton` is false exactly when the immediate container of the
    /// descriptor is a non-caching wrapper. Singleton variants of the
    /// instance, evaluating, lookup, and first-found kinds produce eagerly
    /// here and are frozen into constant producers.
    fn transform(
        &self,
        descriptor: &ProducerDescriptor,
        singleton: bool,
        binding: &Arc<Binding>,
        guard: &mut CycleGuard,
    ) -> Result<Arc<dyn Producer>> {
        let base: Arc<dyn Producer> = match &descriptor.kind {
            ProducerKind::Constant { value } => {
                if singleton {
                    Arc::new(SingletonProducer::new(value.clone()))
                } else {
                    Arc::new(DeepCloningProducer::new(value.clone()))
                }
            }
            ProducerKind::NonCaching { inner } => self.transform(inner, false, binding, guard)?,
            ProducerKind::Instance {
                class_name,
                arguments,
            } => {
                let instantiable = self.capabilities.registry.instantiable(class_name)?;
                let producer = Arc::new(InstantiatingProducer::new(
                    instantiable,
                    arguments.clone(),
                    &binding.producer_args,
                ));
                self.maybe_singleton(producer, singleton, guard)?
            }
            ProducerKind::Evaluating { expression } => self.maybe_singleton(
                Arc::new(EvaluatingProducer::new(expression.clone())),
                singleton,
                guard,
            )?,
            ProducerKind::Lookup { type_shape, name } => self.maybe_singleton(
                Arc::new(LookupProducer::new(type_shape.clone(), name.clone())),
                singleton,
                guard,
            )?,
            ProducerKind::HashLookup {
                type_shape,
                name,
                key,
            } => self.maybe_singleton(
                Arc::new(HashLookupProducer::new(
                    type_shape.clone(),
                    name.clone(),
                    key.clone(),
                )),
                singleton,
                guard,
            )?,
            ProducerKind::FirstFound { producers } => {
                let inner = producers
                    .iter()
                    .map(|descriptor| self.transform(descriptor, true, binding, guard))
                    .collect::<Result<Vec<_>>>()?;
                self.maybe_singleton(Arc::new(FirstFoundProducer::new(inner)), singleton, guard)?
            }
            ProducerKind::ProducerProducer { producer } => {
                let ProducerKind::Instance {
                    class_name,
                    arguments,
                } = &producer.kind
                else {
                    return Err(BinderyError::Configuration {
                        message: "a producer-of-producer descriptor must wrap an instance \
                                  descriptor naming a registered producer factory"
                            .to_string(),
                    });
                };
                let factory = self.capabilities.registry.producer_factory(class_name)?;
                if singleton {
                    Arc::new(SingletonProducerProducer::new(factory.create(arguments)?))
                } else {
                    Arc::new(ProducerProducer::new(factory, arguments.clone()))
                }
            }
            ProducerKind::ArrayMultibind { options } => {
                let producer = Arc::new(ArrayMultibindProducer::new(binding, options.clone())?);
                self.maybe_singleton(producer, singleton, guard)?
            }
            ProducerKind::HashMultibind { options } => {
                let producer = Arc::new(HashMultibindProducer::new(binding, options.clone())?);
                self.maybe_singleton(producer, singleton, guard)?
            }
        };

        Ok(match &descriptor.transformer {
            Some(transformer) => Arc::new(TransformingProducer::new(base, transformer.clone())),
            None => base,
        })
    }

    /// Freeze a producer into its produced value when singleton.
    fn maybe_singleton(
        &self,
        producer: Arc<dyn Producer>,
        singleton: bool,
        guard: &mut CycleGuard,
    ) -> Result<Arc<dyn Producer>> {
        if !singleton {
            return Ok(producer);
        }
        let value = {
            let mut production = Production::new(self, guard);
            producer.produce(&mut production)?
        };
        Ok(Arc::new(SingletonProducer::new(value.unwrap_or(Value::Null))))
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("entries", &self.entries.borrow().len())
            .field("multibinds", &self.contributions.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

enum Probe {
    Missing,
    NotFound,
    Bound {
        binding: Arc<Binding>,
        cached: Option<Arc<dyn Producer>>,
    },
}
