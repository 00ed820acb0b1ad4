//! Expression evaluation capability.
//!
//! Evaluating producers and value transformers delegate to an external
//! evaluator; the engine treats expressions as opaque source text and never
//! interprets them itself. Hosts wire their interpreter in through the
//! [`Evaluator`] trait.

use crate::core::{BinderyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque expression source handed to the [`Evaluator`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression(String);

impl Expression {
    /// Wrap expression source text.
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// The wrapped source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named values visible to an evaluation.
///
/// Transformers receive the produced value under the name `value`.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    bindings: BTreeMap<String, Value>,
}

/// Name under which a transformer's input value is bound.
pub const TRANSFORMED_VALUE: &str = "value";

impl EvalContext {
    /// An empty evaluation context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value` for the evaluation.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }

    /// The value bound to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

/// Capability interface for evaluating embedded expressions.
pub trait Evaluator {
    /// Evaluate `expression` against `context`, producing a value.
    fn evaluate(&self, expression: &Expression, context: &EvalContext) -> Result<Value>;
}

/// Evaluator for hosts that do not embed an interpreter.
///
/// Every evaluation fails; bindings that never use evaluating producers or
/// transformers are unaffected.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvaluator;

impl Evaluator for NullEvaluator {
    fn evaluate(&self, expression: &Expression, _context: &EvalContext) -> Result<Value> {
        Err(BinderyError::Evaluation {
            expression: expression.source().to_string(),
            message: "no evaluator is configured".to_string(),
        })
    }
}
