//! bindery - layered binding resolution and dependency injection
//!
//! A precedence-aware binding engine for plugin and extension wiring: given
//! layered sets of declarative bindings (type/name keys mapped to producer
//! descriptors) and the caller's active categories (environment facets such
//! as node, operating system, or custom facts), bindery merges everything
//! into one effective, conflict-free mapping and serves lookups against it -
//! with overrides, multi-value aggregation (multibinds), and lazy, cached
//! production.
//!
//! # Architecture Overview
//!
//! Resolution happens in two phases:
//! - The [`binder::Binder`] computes the category precedence order and
//!   merges the layered bindings into one flat key-to-binding map, applying
//!   the override/abstract/conflict rules. Merging is deterministic:
//!   identical inputs always produce identical effective bindings.
//! - The [`injector::Injector`] wraps the configured binder, transforms
//!   producer descriptors into live producers on first lookup, memoizes
//!   them per entry, and executes lookups - recursively resolving dependent
//!   lookups under per-call-chain cycle detection, and gathering multibind
//!   contributions for the aggregation combinators.
//!
//! External concerns stay external: type reasoning, expression evaluation,
//! and by-name construction are capability traits
//! ([`types::TypeSystem`], [`evaluator::Evaluator`],
//! [`registry::InstantiableRegistry`]) bundled into
//! [`capabilities::Capabilities`] and passed in explicitly - the engine
//! holds no global state and performs no I/O of its own.
//!
//! # Core Modules
//!
//! - [`bindings`] - The declarative model: bindings, producer descriptors,
//!   categorized containers, layers, and the fluent
//!   [`bindings::BindingsFactory`]
//! - [`binder`] - Category precedence and the layer merge algorithm
//! - [`injector`] - Lookup, descriptor transformation, caching, overrides
//! - [`producers`] - Live producers, including the multibind combinators
//!
//! # Supporting Modules
//!
//! - [`types`] - Type shapes and the structural default type system
//! - [`evaluator`] - Opaque expressions and the evaluation capability
//! - [`registry`] - Instantiables, producer factories, diagnostics sink
//! - [`capabilities`] - The capability bundle
//! - [`config`] - Engine configuration (TOML-loadable)
//! - [`core`] - Error taxonomy and user-facing error contexts
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
//! // Declare bindings: a default, shadowed on production nodes.
//! let mut defaults = BindingsFactory::named_bindings("defaults");
//! defaults.bind().name("pool-size").integer().to(4);
//! defaults
//!     .when_in_category("environment", "production")
//!     .bind()
//!     .name("pool-size")
//!     .integer()
//!     .to(32);
//!
//! let layered = BindingsFactory::layered_bindings(vec![BindingsFactory::layer(
//!     "app",
//!     vec![defaults.build()],
//! )]);
//!
//! // Merge under the active categories, then look up.
//! let mut binder = Binder::new(EngineConfig::default(), Capabilities::structural());
//! binder
//!     .set_categories(&BindingsFactory::categories(&[("environment", "production")]))
//!     .unwrap();
//! binder.set_layers(&layered).unwrap();
//!
//! let injector = Injector::new(binder).unwrap();
//! assert_eq!(injector.lookup("pool-size").unwrap(), Some(json!(32)));
//! ```

// Core functionality modules
pub mod binder;
pub mod bindings;
pub mod config;
pub mod core;
pub mod injector;
pub mod producers;

// Capability seams
pub mod capabilities;
pub mod evaluator;
pub mod registry;
pub mod types;

// Supporting modules
pub mod constants;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use binder::{Binder, BindingOrigin, Precedence};
pub use bindings::key::{Key, KeyFactory};
pub use bindings::{Binding, BindingsFactory, EffectiveCategories, LayeredBindings};
pub use capabilities::Capabilities;
pub use config::EngineConfig;
pub use crate::core::{BinderyError, ErrorContext, Result, user_friendly_error};
pub use injector::{Contribution, Injector, InjectorEntry, Production};
pub use producers::Producer;
pub use registry::{DiagnosticsSink, Instantiable, InstantiableRegistry, ProducerFactory};
pub use types::{StructuralTypeSystem, TypeShape, TypeSystem};
