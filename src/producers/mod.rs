//! Live producers created from producer descriptors.
//!
//! The injector transforms each descriptor into exactly one of the
//! producers in this module (see the transform rules in
//! [`crate::injector`]). Producers are passive: they hold whatever state
//! their descriptor fixed at transform time and resolve everything else
//! through the [`Production`] context they are handed on each call, so the
//! caller's cycle guard travels through every nested lookup.
//!
//! Producing `Ok(None)` means "nothing found"; `Value::Null` results are
//! normalized to `None` so the two are indistinguishable to callers.

use crate::bindings::ProducerArg;
use crate::core::Result;
use crate::evaluator::{EvalContext, Expression, TRANSFORMED_VALUE};
use crate::injector::Production;
use crate::registry::{Instantiable, ProducerFactory};
use crate::types::TypeShape;
use serde_json::Value;
use std::cell::RefCell;
use std::sync::Arc;

mod multibind;


pub use multibind::{ArrayMultibindProducer, HashMultibindProducer};

/// A live producer of values.
///
/// `produce` resolves one value; `on_producer_request` is invoked when the
/// producer itself (rather than a value) is requested, which is what
/// restarts a producer-of-producer series.
pub trait Producer {
    /// Produce a value, resolving dependent lookups through `production`.
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>>;

    /// Refresh internal state before the producer is handed out.
    fn on_producer_request(&self, production: &mut Production<'_>) -> Result<()> {
        let _ = production;
        Ok(())
    }
}

/// Normalize `Null` to "nothing produced".
pub(crate) fn non_null(value: Value) -> Option<Value> {
    if value.is_null() { None } else { Some(value) }
}

/// Structural deep copy over the value domain.
///
/// Scalars are immutable and returned as-is; sequences and maps are rebuilt
/// recursively.
#[must_use]
pub fn deep_copy(value: &Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.clone(),
        Value::Array(items) => Value::Array(items.iter().map(deep_copy).collect()),
        Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), deep_copy(v))).collect(),
        ),
    }
}

/// Produces the same value on every production.
#[derive(Debug)]
pub struct SingletonProducer {
    value: Value,
}

impl SingletonProducer {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Producer for SingletonProducer {
    fn produce(&self, _production: &mut Production<'_>) -> Result<Option<Value>> {
        Ok(non_null(self.value.clone()))
    }
}

/// Produces a structural deep copy of its value on every production.
#[derive(Debug)]
pub struct DeepCloningProducer {
    value: Value,
}

impl DeepCloningProducer {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Producer for DeepCloningProducer {
    fn produce(&self, _production: &mut Production<'_>) -> Result<Option<Value>> {
        Ok(non_null(deep_copy(&self.value)))
    }
}

/// Constructs an instance of a registered type on every production.
///
/// The type's injection hook is consulted first; without one the plain
/// constructor is used. Descriptor arguments come first, followed by the
/// binding's `producer_args`.
pub struct InstantiatingProducer {
    instantiable: Arc<dyn Instantiable>,
    args: Vec<ProducerArg>,
}

impl InstantiatingProducer {
    pub(crate) fn new(
        instantiable: Arc<dyn Instantiable>,
        mut args: Vec<ProducerArg>,
        binding_args: &[ProducerArg],
    ) -> Self {
        args.extend(binding_args.iter().cloned());
        Self { instantiable, args }
    }
}

impl Producer for InstantiatingProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        let value = match self.instantiable.try_injection_hook(production, &self.args)? {
            Some(value) => value,
            None => self.instantiable.default_construct(&self.args)?,
        };
        Ok(non_null(value))
    }
}

/// Delegates production to the evaluator capability.
#[derive(Debug)]
pub struct EvaluatingProducer {
    expression: Expression,
}

impl EvaluatingProducer {
    pub(crate) fn new(expression: Expression) -> Self {
        Self { expression }
    }
}

impl Producer for EvaluatingProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        let value = production.evaluate(&self.expression, &EvalContext::new())?;
        Ok(non_null(value))
    }
}

/// Produces by looking up another type/name through the injector.
#[derive(Debug)]
pub struct LookupProducer {
    type_shape: TypeShape,
    name: String,
}

impl LookupProducer {
    pub(crate) fn new(type_shape: TypeShape, name: String) -> Self {
        Self { type_shape, name }
    }
}

impl Producer for LookupProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        production.lookup_type(&self.type_shape, &self.name)
    }
}

/// Looks up a hash and returns the value at a key within it.
///
/// Produces nothing when the lookup result is not a hash or lacks the key.
#[derive(Debug)]
pub struct HashLookupProducer {
    type_shape: TypeShape,
    name: String,
    key: String,
}

impl HashLookupProducer {
    pub(crate) fn new(type_shape: TypeShape, name: String, key: String) -> Self {
        Self {
            type_shape,
            name,
            key,
        }
    }
}

impl Producer for HashLookupProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        match production.lookup_type(&self.type_shape, &self.name)? {
            Some(Value::Object(map)) => Ok(map.get(&self.key).cloned().and_then(non_null)),
            _ => Ok(None),
        }
    }
}

/// Evaluates inner producers in order, returning the first non-null result.
pub struct FirstFoundProducer {
    producers: Vec<Arc<dyn Producer>>,
}

impl FirstFoundProducer {
    pub(crate) fn new(producers: Vec<Arc<dyn Producer>>) -> Self {
        Self { producers }
    }
}

impl Producer for FirstFoundProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        for producer in &self.producers {
            if let Some(value) = producer.produce(production)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Creates a producer via a registered factory, then delegates to it.
///
/// Each request for the producer re-creates the inner producer, restarting
/// any series it represents; a plain `produce` call creates it only when
/// none exists yet.
pub struct ProducerProducer {
    factory: Arc<dyn ProducerFactory>,
    args: Vec<ProducerArg>,
    inner: RefCell<Option<Arc<dyn Producer>>>,
}

impl ProducerProducer {
    pub(crate) fn new(factory: Arc<dyn ProducerFactory>, args: Vec<ProducerArg>) -> Self {
        Self {
            factory,
            args,
            inner: RefCell::new(None),
        }
    }

    fn current(&self) -> Result<Arc<dyn Producer>> {
        let existing = self.inner.borrow().clone();
        match existing {
            Some(producer) => Ok(producer),
            None => {
                let producer = self.factory.create(&self.args)?;
                *self.inner.borrow_mut() = Some(Arc::clone(&producer));
                Ok(producer)
            }
        }
    }
}

impl Producer for ProducerProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        let inner = self.current()?;
        inner.produce(production)
    }

    fn on_producer_request(&self, _production: &mut Production<'_>) -> Result<()> {
        let producer = self.factory.create(&self.args)?;
        *self.inner.borrow_mut() = Some(producer);
        Ok(())
    }
}

/// Singleton variant of [`ProducerProducer`]: the inner producer is created
/// once at transform time and reused for all productions.
pub struct SingletonProducerProducer {
    inner: Arc<dyn Producer>,
}

impl SingletonProducerProducer {
    pub(crate) fn new(inner: Arc<dyn Producer>) -> Self {
        Self { inner }
    }
}

impl Producer for SingletonProducerProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        self.inner.produce(production)
    }
}

/// Producer created for unbound class keys (assisted injection).
///
/// The instance is computed on first production and cached; requesting the
/// producer recomputes it.
pub struct AssistedInjectProducer {
    instantiable: Arc<dyn Instantiable>,
    instance: RefCell<Option<Value>>,
}

impl AssistedInjectProducer {
    pub(crate) fn new(instantiable: Arc<dyn Instantiable>) -> Self {
        Self {
            instantiable,
            instance: RefCell::new(None),
        }
    }

    fn construct(&self, production: &mut Production<'_>) -> Result<Value> {
        let value = match self.instantiable.try_injection_hook(production, &[])? {
            Some(value) => value,
            None => self.instantiable.default_construct(&[])?,
        };
        Ok(value)
    }
}

impl Producer for AssistedInjectProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        let cached = self.instance.borrow().clone();
        let value = match cached {
            Some(value) => value,
            None => {
                let value = self.construct(production)?;
                *self.instance.borrow_mut() = Some(value.clone());
                value
            }
        };
        Ok(non_null(value))
    }

    fn on_producer_request(&self, production: &mut Production<'_>) -> Result<()> {
        let value = self.construct(production)?;
        *self.instance.borrow_mut() = Some(value);
        Ok(())
    }
}

/// Applies a transformer expression to another producer's result.
///
/// The raw value (or `Null` when nothing was produced) is bound as `value`
/// in the evaluation context.
pub struct TransformingProducer {
    inner: Arc<dyn Producer>,
    transformer: Expression,
}

impl TransformingProducer {
    pub(crate) fn new(inner: Arc<dyn Producer>, transformer: Expression) -> Self {
        Self { inner, transformer }
    }
}

impl Producer for TransformingProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        let raw = self.inner.produce(production)?.unwrap_or(Value::Null);
        let context = EvalContext::new().with(TRANSFORMED_VALUE, raw);
        let transformed = production.evaluate(&self.transformer, &context)?;
        Ok(non_null(transformed))
    }

    fn on_producer_request(&self, production: &mut Production<'_>) -> Result<()> {
        self.inner.on_producer_request(production)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_copy_rebuilds_containers() {
        let original = json!({"a": [1, {"b": "x"}], "c": true});
        let copy = deep_copy(&original);
        assert_eq!(copy, original);
    }

    #[test]
    fn non_null_drops_null() {
        assert_eq!(non_null(Value::Null), None);
        assert_eq!(non_null(json!(0)), Some(json!(0)));
        assert_eq!(non_null(json!(false)), Some(json!(false)));
    }
}
