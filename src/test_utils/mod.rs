//! Test utilities for bindery
//!
//! Scripted capability implementations used by the unit and integration
//! tests: a table-driven evaluator, deterministic instantiables, a counting
//! producer factory for series semantics, and a recording diagnostics sink.
//!
//! Available to downstream crates through the `test-utils` feature.

use crate::bindings::ProducerArg;
use crate::core::{BinderyError, Result};
use crate::evaluator::{EvalContext, Evaluator, Expression, TRANSFORMED_VALUE};
use crate::injector::Production;
use crate::producers::Producer;
use crate::registry::{DiagnosticsSink, Instantiable, ProducerFactory};
use serde_json::{Map, Value, json};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Evaluator answering from a fixed expression table.
///
/// Expressions of the form `value` echo the transformer input; everything
/// else must be present in the table.
#[derive(Debug, Default)]
pub struct TableEvaluator {
    answers: BTreeMap<String, Value>,
}

impl TableEvaluator {
    /// An evaluator with no scripted answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script an answer for an expression source text.
    #[must_use]
    pub fn with_answer(mut self, expression: impl Into<String>, value: Value) -> Self {
        self.answers.insert(expression.into(), value);
        self
    }
}

impl Evaluator for TableEvaluator {
    fn evaluate(&self, expression: &Expression, context: &EvalContext) -> Result<Value> {
        if expression.source() == TRANSFORMED_VALUE {
            return Ok(context.get(TRANSFORMED_VALUE).cloned().unwrap_or(Value::Null));
        }
        self.answers.get(expression.source()).cloned().ok_or_else(|| {
            BinderyError::Evaluation {
                expression: expression.source().to_string(),
                message: "no scripted answer".to_string(),
            }
        })
    }
}

/// Evaluator applying a host-supplied function.
///
/// Useful for transformer tests that derive the result from the produced
/// value in the context.
pub struct FnEvaluator {
    function: Box<dyn Fn(&Expression, &EvalContext) -> Result<Value>>,
}

impl FnEvaluator {
    /// Wrap an evaluation function.
    pub fn new(function: impl Fn(&Expression, &EvalContext) -> Result<Value> + 'static) -> Self {
        Self {
            function: Box::new(function),
        }
    }
}

impl Evaluator for FnEvaluator {
    fn evaluate(&self, expression: &Expression, context: &EvalContext) -> Result<Value> {
        (self.function)(expression, context)
    }
}

/// Evaluator returning 1, 2, 3, ... across calls.
///
/// Shows whether an evaluating producer was re-run or served from a
/// singleton cache.
#[derive(Debug, Default)]
pub struct CountingEvaluator {
    calls: Cell<i64>,
}

impl CountingEvaluator {
    /// A counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Evaluator for CountingEvaluator {
    fn evaluate(&self, _expression: &Expression, _context: &EvalContext) -> Result<Value> {
        let next = self.calls.get() + 1;
        self.calls.set(next);
        Ok(json!(next))
    }
}

/// Instantiable constructing `{"class": <name>, "args": {...}}` objects.
#[derive(Debug)]
pub struct EchoInstantiable {
    class_name: String,
}

impl EchoInstantiable {
    /// An instantiable reporting the given class name.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }
}

impl Instantiable for EchoInstantiable {
    fn default_construct(&self, args: &[ProducerArg]) -> Result<Value> {
        let mut fields = Map::new();
        fields.insert("class".to_string(), json!(self.class_name));
        let mut arg_map = Map::new();
        for (index, arg) in args.iter().enumerate() {
            let key = if arg.name.is_empty() {
                index.to_string()
            } else {
                arg.name.clone()
            };
            arg_map.insert(key, arg.value.clone());
        }
        fields.insert("args".to_string(), Value::Object(arg_map));
        Ok(Value::Object(fields))
    }
}

/// Instantiable whose injection hook looks up a named value.
///
/// Constructs `{"class": <name>, "injected": <lookup result>}`, exercising
/// hook-driven construction with nested lookups.
#[derive(Debug)]
pub struct HookedInstantiable {
    class_name: String,
    lookup_name: String,
}

impl HookedInstantiable {
    /// Hook looking up the `Data`-typed `lookup_name`.
    pub fn new(class_name: impl Into<String>, lookup_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            lookup_name: lookup_name.into(),
        }
    }
}

impl Instantiable for HookedInstantiable {
    fn try_injection_hook(
        &self,
        production: &mut Production<'_>,
        _args: &[ProducerArg],
    ) -> Result<Option<Value>> {
        let injected = production.lookup(&self.lookup_name)?.unwrap_or(Value::Null);
        Ok(Some(json!({
            "class": self.class_name,
            "injected": injected,
        })))
    }

    fn default_construct(&self, _args: &[ProducerArg]) -> Result<Value> {
        Ok(json!({ "class": self.class_name }))
    }
}

/// Producer counting productions per instance: 1, 2, 3, ...
#[derive(Debug, Default)]
pub struct SequenceProducer {
    produced: Cell<i64>,
}

impl Producer for SequenceProducer {
    fn produce(&self, _production: &mut Production<'_>) -> Result<Option<Value>> {
        let next = self.produced.get() + 1;
        self.produced.set(next);
        Ok(Some(json!(next)))
    }
}

/// Factory creating fresh [`SequenceProducer`]s.
///
/// Each created producer restarts its series from 1, and the factory counts
/// how many producers it has created.
#[derive(Debug, Default)]
pub struct SequenceProducerFactory {
    created: Cell<usize>,
}

impl SequenceProducerFactory {
    /// A factory with no created producers yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many producers this factory has created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.get()
    }
}

impl ProducerFactory for SequenceProducerFactory {
    fn create(&self, _args: &[ProducerArg]) -> Result<Arc<dyn Producer>> {
        self.created.set(self.created.get() + 1);
        Ok(Arc::new(SequenceProducer::default()))
    }
}

/// Diagnostics sink recording every accepted issue.
#[derive(Debug, Default)]
pub struct RecordingDiagnosticsSink {
    issues: RefCell<Vec<(String, String, String)>>,
}

impl RecordingDiagnosticsSink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded `(issue_code, subject, details)` triples.
    #[must_use]
    pub fn issues(&self) -> Vec<(String, String, String)> {
        self.issues.borrow().clone()
    }
}

impl DiagnosticsSink for RecordingDiagnosticsSink {
    fn accept(&self, issue_code: &str, subject: &str, details: &str) {
        self.issues.borrow_mut().push((
            issue_code.to_string(),
            subject.to_string(),
            details.to_string(),
        ));
    }
}
