//! Fluent construction of bindings models.
//!
//! The factory builds the declarative tree without exposing its raw structs:
//!
//! ```
//! use bindery::bindings::BindingsFactory;
//!
//! let mut b = BindingsFactory::named_bindings("my-module");
//! b.bind().name("answer").integer().to(42);
//! b.multibind("handlers").name("all-handlers").array_of_data();
//! b.bind_in_multibind("handlers").name("file").string().to("file-handler");
//! let named = b.build();
//! ```
//!
//! Builders are also the surface handed to
//! [`Injector::override_with`](crate::injector::Injector::override_with)
//! blocks.

use crate::bindings::{
    ArrayMultibindOptions, Binding, BindingsEntry, Category, CategorizedBindings,
    EffectiveCategories, HashMultibindOptions, LayeredBindings, NamedBindings, NamedLayer,
    ProducerArg, ProducerDescriptor, ProducerKind,
};
use crate::evaluator::Expression;
use crate::types::TypeShape;
use serde_json::Value;

/// Entry points for building bindings models.
pub struct BindingsFactory;

impl BindingsFactory {
    /// Start a named bindings group.
    pub fn named_bindings(name: impl Into<String>) -> NamedBindingsBuilder {
        NamedBindingsBuilder {
            name: name.into(),
            container: ContainerBuilder::default(),
        }
    }

    /// A named layer over already-built groups.
    pub fn layer(name: impl Into<String>, bindings: Vec<NamedBindings>) -> NamedLayer {
        NamedLayer {
            name: name.into(),
            bindings,
        }
    }

    /// A layered model; pass layers highest-precedence first.
    #[must_use]
    pub fn layered_bindings(layers: Vec<NamedLayer>) -> LayeredBindings {
        LayeredBindings { layers }
    }

    /// Effective categories from `(categorization, value)` pairs, highest
    /// precedence first.
    #[must_use]
    pub fn categories(pairs: &[(&str, &str)]) -> EffectiveCategories {
        EffectiveCategories::new(
            pairs
                .iter()
                .map(|(categorization, value)| Category::new(*categorization, *value))
                .collect(),
        )
    }
}

/// Shared state of container-like builders.
#[derive(Default)]
struct ContainerBuilder {
    entries: Vec<EntryBuilder>,
}

enum EntryBuilder {
    Binding(BindingBuilder),
    Categorized(Box<CategorizedBuilder>),
}

impl ContainerBuilder {
    fn bind(&mut self) -> &mut BindingBuilder {
        self.entries.push(EntryBuilder::Binding(BindingBuilder::new()));
        match self.entries.last_mut() {
            Some(EntryBuilder::Binding(builder)) => builder,
            _ => unreachable!("just pushed a binding builder"),
        }
    }

    fn categorized(&mut self, predicates: Vec<Category>) -> &mut CategorizedBuilder {
        self.entries.push(EntryBuilder::Categorized(Box::new(CategorizedBuilder {
            predicates,
            container: ContainerBuilder::default(),
        })));
        match self.entries.last_mut() {
            Some(EntryBuilder::Categorized(builder)) => builder,
            _ => unreachable!("just pushed a categorized builder"),
        }
    }

    fn build(self) -> Vec<BindingsEntry> {
        self.entries
            .into_iter()
            .map(|entry| match entry {
                EntryBuilder::Binding(builder) => BindingsEntry::Binding(builder.build()),
                EntryBuilder::Categorized(builder) => {
                    BindingsEntry::Categorized(CategorizedBindings {
                        predicates: builder.predicates,
                        bindings: builder.container.build(),
                    })
                }
            })
            .collect()
    }
}

/// Builder for a named bindings group.
pub struct NamedBindingsBuilder {
    name: String,
    container: ContainerBuilder,
}

impl NamedBindingsBuilder {
    /// Add an empty binding and return its builder for detailing.
    pub fn bind(&mut self) -> &mut BindingBuilder {
        self.container.bind()
    }

    /// Add a multibinding with the given id.
    ///
    /// Leave its producer unset to let the injector auto-select an array or
    /// hash aggregator from the declared type.
    pub fn multibind(&mut self, id: impl Into<String>) -> &mut BindingBuilder {
        let builder = self.container.bind();
        builder.binding.multibind = Some(id.into());
        builder
    }

    /// Add a binding contributing to the multibind with the given id.
    pub fn bind_in_multibind(&mut self, id: impl Into<String>) -> &mut BindingBuilder {
        let builder = self.container.bind();
        builder.binding.multibind_id = Some(id.into());
        builder
    }

    /// Add a conditional subtree with a single category predicate.
    pub fn when_in_category(
        &mut self,
        categorization: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut CategorizedBuilder {
        self.container
            .categorized(vec![Category::new(categorization, value)])
    }

    /// Add a conditional subtree requiring every listed category to match.
    pub fn when_in_categories(&mut self, pairs: &[(&str, &str)]) -> &mut CategorizedBuilder {
        let predicates = pairs
            .iter()
            .map(|(categorization, value)| Category::new(*categorization, *value))
            .collect();
        self.container.categorized(predicates)
    }

    /// Finish the group.
    #[must_use]
    pub fn build(self) -> NamedBindings {
        NamedBindings {
            name: self.name,
            bindings: self.container.build(),
        }
    }
}

/// Builder for a categorized subtree.
pub struct CategorizedBuilder {
    predicates: Vec<Category>,
    container: ContainerBuilder,
}

impl CategorizedBuilder {
    /// Add an empty binding and return its builder for detailing.
    pub fn bind(&mut self) -> &mut BindingBuilder {
        self.container.bind()
    }

    /// Add a binding contributing to the multibind with the given id.
    pub fn bind_in_multibind(&mut self, id: impl Into<String>) -> &mut BindingBuilder {
        let builder = self.container.bind();
        builder.binding.multibind_id = Some(id.into());
        builder
    }

    /// Nest a further conditional subtree.
    pub fn when_in_category(
        &mut self,
        categorization: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut CategorizedBuilder {
        self.container
            .categorized(vec![Category::new(categorization, value)])
    }

    /// Nest a further conditional subtree with multiple predicates.
    pub fn when_in_categories(&mut self, pairs: &[(&str, &str)]) -> &mut CategorizedBuilder {
        let predicates = pairs
            .iter()
            .map(|(categorization, value)| Category::new(*categorization, *value))
            .collect();
        self.container.categorized(predicates)
    }
}

/// Builder detailing a single binding.
pub struct BindingBuilder {
    binding: Binding,
    pending_transformer: Option<Expression>,
}

impl BindingBuilder {
    fn new() -> Self {
        Self {
            binding: Binding::default(),
            pending_transformer: None,
        }
    }

    /// Set the binding name.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.binding.name = name.into();
        self
    }

    /// Set the declared type.
    pub fn type_shape(&mut self, type_shape: TypeShape) -> &mut Self {
        self.binding.type_shape = type_shape;
        self
    }

    /// Declare the `Data` type (the default).
    pub fn data(&mut self) -> &mut Self {
        self.type_shape(TypeShape::Data)
    }

    /// Declare the `Integer` type.
    pub fn integer(&mut self) -> &mut Self {
        self.type_shape(TypeShape::Integer)
    }

    /// Declare the `Float` type.
    pub fn float(&mut self) -> &mut Self {
        self.type_shape(TypeShape::Float)
    }

    /// Declare the `Boolean` type.
    pub fn boolean(&mut self) -> &mut Self {
        self.type_shape(TypeShape::Boolean)
    }

    /// Declare the `String` type.
    pub fn string(&mut self) -> &mut Self {
        self.type_shape(TypeShape::String)
    }

    /// Declare an `Array` of the given element type.
    pub fn array_of(&mut self, element: TypeShape) -> &mut Self {
        self.type_shape(TypeShape::Array(Box::new(element)))
    }

    /// Declare `Array[Data]`.
    pub fn array_of_data(&mut self) -> &mut Self {
        self.type_shape(TypeShape::array_of_data())
    }

    /// Declare a `Hash` with `String` keys and the given element type.
    pub fn hash_of(&mut self, element: TypeShape) -> &mut Self {
        self.type_shape(TypeShape::Hash(
            Box::new(TypeShape::String),
            Box::new(element),
        ))
    }

    /// Declare `Hash[String, Data]`.
    pub fn hash_of_data(&mut self) -> &mut Self {
        self.type_shape(TypeShape::hash_of_data())
    }

    /// Declare a `Class` type.
    pub fn class(&mut self, name: impl Into<String>) -> &mut Self {
        self.type_shape(TypeShape::Class(name.into()))
    }

    /// Mark the binding as overriding a lower-precedence binding.
    pub fn mark_override(&mut self) -> &mut Self {
        self.binding.is_override = true;
        self
    }

    /// Mark the binding as requiring an override.
    pub fn mark_abstract(&mut self) -> &mut Self {
        self.binding.is_abstract = true;
        self
    }

    /// Mark the binding as not shadowable by higher layers.
    pub fn mark_final(&mut self) -> &mut Self {
        self.binding.is_final = true;
        self
    }

    /// Append a named injection-hook argument.
    pub fn producer_arg(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.binding.producer_args.push(ProducerArg::named(name, value));
        self
    }

    /// Bind to a constant value.
    pub fn to(&mut self, value: impl Into<Value>) -> &mut Self {
        self.set_producer(ProducerDescriptor::constant(value.into()))
    }

    /// Bind to a lookup of another type/name.
    pub fn to_lookup(&mut self, type_shape: TypeShape, name: impl Into<String>) -> &mut Self {
        self.set_producer(ProducerDescriptor::lookup(type_shape, name))
    }

    /// Bind to a key within a looked-up hash.
    pub fn to_hash_lookup(
        &mut self,
        type_shape: TypeShape,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> &mut Self {
        self.set_producer(ProducerDescriptor::new(ProducerKind::HashLookup {
            type_shape,
            name: name.into(),
            key: key.into(),
        }))
    }

    /// Bind to an instance of a registered type.
    pub fn to_instance(&mut self, class_name: impl Into<String>) -> &mut Self {
        self.to_instance_with_args(class_name, Vec::new())
    }

    /// Bind to an instance of a registered type with constructor arguments.
    pub fn to_instance_with_args(
        &mut self,
        class_name: impl Into<String>,
        arguments: Vec<ProducerArg>,
    ) -> &mut Self {
        self.set_producer(ProducerDescriptor::new(ProducerKind::Instance {
            class_name: class_name.into(),
            arguments,
        }))
    }

    /// Bind to the evaluation of an expression.
    pub fn to_evaluation(&mut self, expression: impl Into<String>) -> &mut Self {
        self.set_producer(ProducerDescriptor::new(ProducerKind::Evaluating {
            expression: Expression::new(expression),
        }))
    }

    /// Bind to a producer created by a registered producer factory.
    pub fn to_producer(&mut self, class_name: impl Into<String>) -> &mut Self {
        self.to_producer_with_args(class_name, Vec::new())
    }

    /// Bind to a producer created by a registered producer factory, passing
    /// arguments to the factory.
    pub fn to_producer_with_args(
        &mut self,
        class_name: impl Into<String>,
        arguments: Vec<ProducerArg>,
    ) -> &mut Self {
        self.set_producer(ProducerDescriptor::new(ProducerKind::ProducerProducer {
            producer: Box::new(ProducerDescriptor::new(ProducerKind::Instance {
                class_name: class_name.into(),
                arguments,
            })),
        }))
    }

    /// Bind to the first non-null result of the given descriptors.
    pub fn to_first_found(&mut self, producers: Vec<ProducerDescriptor>) -> &mut Self {
        self.set_producer(ProducerDescriptor::new(ProducerKind::FirstFound {
            producers,
        }))
    }

    /// Bind to an explicit descriptor.
    pub fn to_descriptor(&mut self, descriptor: ProducerDescriptor) -> &mut Self {
        self.set_producer(descriptor)
    }

    /// Bind to an array multibind aggregator with explicit options.
    pub fn to_array_multibind(&mut self, options: ArrayMultibindOptions) -> &mut Self {
        self.set_producer(ProducerDescriptor::new(ProducerKind::ArrayMultibind {
            options,
        }))
    }

    /// Bind to a hash multibind aggregator with explicit options.
    pub fn to_hash_multibind(&mut self, options: HashMultibindOptions) -> &mut Self {
        self.set_producer(ProducerDescriptor::new(ProducerKind::HashMultibind {
            options,
        }))
    }

    /// Wrap the current producer so it is produced fresh on every lookup.
    ///
    /// Call after one of the `to_*` methods.
    pub fn non_caching(&mut self) -> &mut Self {
        if let Some(descriptor) = self.binding.producer.take() {
            self.binding.producer = Some(descriptor.non_caching());
        }
        self
    }

    /// Transform the produced value with an expression.
    ///
    /// The expression sees the raw value bound as `value`. May be called
    /// before or after the `to_*` method.
    pub fn transformer(&mut self, expression: impl Into<String>) -> &mut Self {
        let expression = Expression::new(expression);
        match &mut self.binding.producer {
            Some(descriptor) => descriptor.transformer = Some(expression),
            None => self.pending_transformer = Some(expression),
        }
        self
    }

    fn set_producer(&mut self, mut descriptor: ProducerDescriptor) -> &mut Self {
        if let Some(transformer) = self.pending_transformer.take() {
            descriptor.transformer = Some(transformer);
        }
        self.binding.producer = Some(descriptor);
        self
    }

    fn build(self) -> Binding {
        self.binding
    }
}
