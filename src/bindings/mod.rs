//! Declarative bindings model.
//!
//! A binding maps a type/name key to a producer descriptor and is declared
//! inside a tree of containers: named bindings group related rules, and
//! categorized containers make their subtree conditional on the active
//! categories. Layers order whole groups of named bindings by precedence.
//! The model is purely declarative and serializable; nothing here produces
//! values - the binder merges the model (see [`crate::binder`]) and the
//! injector brings the merged result to life (see [`crate::injector`]).
//!
//! # Example
//!
//! ```
//! use bindery::bindings::BindingsFactory;
//!
//! let mut bindings = BindingsFactory::named_bindings("defaults");
//! bindings.bind().name("timeout").integer().to(30);
//! bindings
//!     .when_in_category("environment", "production")
//!     .bind()
//!     .name("timeout")
//!     .integer()
//!     .to(300);
//! let model = bindings.build();
//! assert_eq!(model.name, "defaults");
//! ```

use crate::evaluator::Expression;
use crate::types::TypeShape;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod factory;
pub mod key;

pub use factory::{
    BindingBuilder, BindingsFactory, CategorizedBuilder, NamedBindingsBuilder,
};
pub use key::{Key, KeyFactory};

#[cfg(test)]
mod factory_tests;

/// A named producer argument.
///
/// Arguments are handed to instantiables and producer factories in
/// declaration order; positional arguments use an empty name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerArg {
    /// Argument name; empty for positional arguments
    pub name: String,
    /// Argument value
    pub value: Value,
}

impl ProducerArg {
    /// A named argument.
    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// A positional argument.
    #[must_use]
    pub fn positional(value: Value) -> Self {
        Self {
            name: String::new(),
            value,
        }
    }
}

/// Flatten behavior for multibind post-processing.
///
/// `Bool(true)` flattens nested sequences to unlimited depth, `Bool(false)`
/// disables flattening, and `Depth(n)` flattens `n` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flatten {
    /// `true` = unlimited depth, `false` = none
    Bool(bool),
    /// Flatten exactly this many nesting levels
    Depth(u32),
}

/// Conflict-resolution policy for hash multibinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Keep the highest-precedence contribution per name; equal precedence
    /// is an error.
    #[default]
    Priority,
    /// Keep the highest-precedence contribution; silently drop the rest.
    Ignore,
    /// Any duplicate name is an error, regardless of precedence.
    Error,
    /// Wrap each value in a one-element array and concatenate duplicates.
    Append,
    /// Merge mapping values; lower-precedence keys never overwrite higher.
    Merge,
}

/// Options controlling array multibind aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayMultibindOptions {
    /// Keep only the highest-precedence contribution per non-empty name.
    pub priority_on_named: bool,
    /// Keep only the highest-precedence unnamed contribution.
    pub priority_on_unnamed: bool,
    /// Flatten the assembled sequence (before `uniq`).
    pub flatten: Option<Flatten>,
    /// Drop duplicate values from the assembled sequence.
    pub uniq: bool,
}

impl Default for ArrayMultibindOptions {
    fn default() -> Self {
        Self {
            priority_on_named: true,
            priority_on_unnamed: false,
            flatten: None,
            uniq: false,
        }
    }
}

/// Options controlling hash multibind aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashMultibindOptions {
    /// How duplicate names are resolved.
    pub conflict_resolution: ConflictResolution,
    /// Flatten appended arrays (only meaningful with `append`).
    pub flatten: Option<Flatten>,
    /// Deduplicate appended arrays (only meaningful with `append`).
    pub uniq: bool,
}

/// Declarative description of how to obtain a value.
///
/// The closed set of kinds is matched exhaustively by the injector's
/// transform; every kind maps to exactly one producer-construction rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProducerKind {
    /// A literal value.
    Constant {
        /// The value produced verbatim (singleton) or deep-copied
        value: Value,
    },
    /// Marks the wrapped descriptor as non-singleton.
    NonCaching {
        /// The wrapped descriptor
        inner: Box<ProducerDescriptor>,
    },
    /// Construct an instance of a registered type.
    Instance {
        /// Name registered with the instantiable registry
        class_name: String,
        /// Constructor arguments
        arguments: Vec<ProducerArg>,
    },
    /// Delegate to the evaluator capability.
    Evaluating {
        /// The expression to evaluate
        expression: Expression,
    },
    /// Produce by looking up another key.
    Lookup {
        /// Requested type
        type_shape: TypeShape,
        /// Requested name
        name: String,
    },
    /// Look up a hash and return the value at a key within it.
    HashLookup {
        /// Requested type
        type_shape: TypeShape,
        /// Requested name
        name: String,
        /// Key within the looked-up hash
        key: String,
    },
    /// Evaluate inner producers in order; first non-null wins.
    FirstFound {
        /// The ordered candidates
        producers: Vec<ProducerDescriptor>,
    },
    /// A producer obtained from another producer.
    ///
    /// The wrapped descriptor must be an [`ProducerKind::Instance`] naming a
    /// registered producer factory.
    ProducerProducer {
        /// Descriptor of the producer-producing instance
        producer: Box<ProducerDescriptor>,
    },
    /// Aggregate array-multibind contributions.
    ArrayMultibind {
        /// Aggregation options
        options: ArrayMultibindOptions,
    },
    /// Aggregate hash-multibind contributions.
    HashMultibind {
        /// Aggregation options
        options: HashMultibindOptions,
    },
}

/// A producer descriptor: a kind plus an optional value transformer.
///
/// The transformer expression is evaluated against the produced value
/// (bound as `value` in the evaluation context) after internal production
/// completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerDescriptor {
    /// What to produce
    pub kind: ProducerKind,
    /// Optional post-processing transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<Expression>,
}

impl ProducerDescriptor {
    /// Descriptor of the given kind with no transformer.
    #[must_use]
    pub fn new(kind: ProducerKind) -> Self {
        Self {
            kind,
            transformer: None,
        }
    }

    /// A constant-value descriptor.
    #[must_use]
    pub fn constant(value: Value) -> Self {
        Self::new(ProducerKind::Constant { value })
    }

    /// A lookup descriptor.
    #[must_use]
    pub fn lookup(type_shape: TypeShape, name: impl Into<String>) -> Self {
        Self::new(ProducerKind::Lookup {
            type_shape,
            name: name.into(),
        })
    }

    /// A non-caching wrapper around `self`.
    #[must_use]
    pub fn non_caching(self) -> Self {
        Self::new(ProducerKind::NonCaching {
            inner: Box::new(self),
        })
    }

    /// Attach a transformer expression.
    #[must_use]
    pub fn with_transformer(mut self, transformer: Expression) -> Self {
        self.transformer = Some(transformer);
        self
    }
}

/// A single declarative binding rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Declared type of the bound value.
    pub type_shape: TypeShape,
    /// Binding name; empty for unnamed bindings.
    pub name: String,
    /// This binding is expected to override a lower-precedence binding;
    /// it is an error if it never does.
    #[serde(default)]
    pub is_override: bool,
    /// This binding must be overridden by a higher-precedence binding.
    #[serde(default)]
    pub is_abstract: bool,
    /// This binding may not be shadowed by a higher layer.
    #[serde(default)]
    pub is_final: bool,
    /// Id of the multibind aggregate this binding declares; `Some` makes
    /// this a multibinding.
    #[serde(default)]
    pub multibind: Option<String>,
    /// Id of the multibind aggregate this binding contributes to.
    #[serde(default)]
    pub multibind_id: Option<String>,
    /// How to produce the bound value.
    ///
    /// May be `None` only on multibindings, which auto-select an aggregator
    /// from their declared type.
    #[serde(default)]
    pub producer: Option<ProducerDescriptor>,
    /// Extra arguments handed to injection hooks, in declaration order.
    #[serde(default)]
    pub producer_args: Vec<ProducerArg>,
}

impl Default for Binding {
    fn default() -> Self {
        Self {
            type_shape: TypeShape::Data,
            name: String::new(),
            is_override: false,
            is_abstract: false,
            is_final: false,
            multibind: None,
            multibind_id: None,
            producer: None,
            producer_args: Vec::new(),
        }
    }
}

/// A category: a categorization name and its value, e.g. `("os", "linux")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// The categorization name
    pub categorization: String,
    /// The active value in that categorization
    pub value: String,
}

impl Category {
    /// Create a category.
    pub fn new(categorization: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            categorization: categorization.into(),
            value: value.into(),
        }
    }
}

/// The caller-supplied active categories, highest precedence first.
///
/// The implicit `common` categorization is always present and always lowest;
/// it is not listed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveCategories {
    /// Active categories, highest precedence first
    pub categories: Vec<Category>,
}

impl EffectiveCategories {
    /// Create effective categories from an ordered list.
    #[must_use]
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }
}

/// One entry in a bindings container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingsEntry {
    /// A leaf binding rule
    Binding(Binding),
    /// A conditional subtree
    Categorized(CategorizedBindings),
}

/// Bindings included only when every predicate matches the active
/// categories.
///
/// A predicate naming a categorization absent from the active set never
/// matches, so the whole subtree is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedBindings {
    /// Conjunction of category predicates
    pub predicates: Vec<Category>,
    /// The conditional entries
    pub bindings: Vec<BindingsEntry>,
}

/// A named, ordered group of bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedBindings {
    /// Group name, used in error messages
    pub name: String,
    /// The entries, in declaration order
    pub bindings: Vec<BindingsEntry>,
}

/// A named layer: an ordered sequence of named bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLayer {
    /// Layer name, used in error messages
    pub name: String,
    /// The named bindings contributed to this layer
    pub bindings: Vec<NamedBindings>,
}

/// The full layered model, highest-precedence layer first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayeredBindings {
    /// Layers, highest first
    pub layers: Vec<NamedLayer>,
}
