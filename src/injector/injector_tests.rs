#[cfg(test)]
mod tests {
    use crate::binder::Binder;
    use crate::bindings::{BindingsFactory, NamedLayer, ProducerArg, ProducerDescriptor};
    use crate::capabilities::Capabilities;
    use crate::config::EngineConfig;
    use crate::core::{BinderyError, Result};
    use crate::injector::Injector;
    use crate::registry::{Instantiable, InstantiableRegistry};
    use crate::test_utils::{
        CountingEvaluator, EchoInstantiable, FnEvaluator, HookedInstantiable,
        SequenceProducerFactory, TableEvaluator,
    };
    use crate::types::TypeShape;
    use serde_json::{Value, json};
    use std::cell::Cell;
    use std::sync::Arc;

    fn build_injector(
        capabilities: Capabilities,
        categories: &[(&str, &str)],
        layers: Vec<NamedLayer>,
    ) -> Arc<Injector> {
        let mut binder = Binder::new(EngineConfig::default(), capabilities);
        binder.set_categories(&BindingsFactory::categories(categories)).unwrap();
        binder
            .set_layers(&BindingsFactory::layered_bindings(layers))
            .unwrap();
        Injector::new(binder).unwrap()
    }

    fn single_layer(group: crate::bindings::NamedBindings) -> Vec<NamedLayer> {
        vec![BindingsFactory::layer("base", vec![group])]
    }

    /// Instantiable constructing `{"serial": N}` with N increasing per call.
    #[derive(Debug, Default)]
    struct CountingInstantiable {
        constructed: Cell<i64>,
    }

    impl Instantiable for CountingInstantiable {
        fn default_construct(&self, _args: &[ProducerArg]) -> Result<Value> {
            let next = self.constructed.get() + 1;
            self.constructed.set(next);
            Ok(json!({ "serial": next }))
        }
    }

    #[test]
    fn injector_requires_a_configured_binder() {
        let binder = Binder::new(EngineConfig::default(), Capabilities::structural());
        let err = Injector::new(binder).unwrap_err();
        assert!(matches!(err, BinderyError::Configuration { .. }));
    }

    #[test]
    fn looks_up_values_in_the_common_layer() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("answer").integer().to(42);
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        assert_eq!(injector.lookup("answer").unwrap(), Some(json!(42)));
        assert_eq!(
            injector.lookup_type(&TypeShape::Integer, "answer").unwrap(),
            Some(json!(42))
        );
        let key = injector.named_key(TypeShape::Integer, "answer");
        assert_eq!(injector.lookup_key(&key).unwrap(), Some(json!(42)));
    }

    #[test]
    fn missing_lookups_return_none() {
        let group = BindingsFactory::named_bindings("empty");
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        assert_eq!(injector.lookup("nothing").unwrap(), None);
        // the miss is cached as a not-found marker; a second lookup sees it
        assert_eq!(injector.lookup("nothing").unwrap(), None);
        assert!(injector.lookup_producer("nothing").unwrap().is_none());
    }

    #[test]
    fn all_data_subtypes_share_one_key() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("url").string().to("http://example.com");
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        // bound with a String type, found via Data-typed name lookup
        assert_eq!(
            injector.lookup("url").unwrap(),
            Some(json!("http://example.com"))
        );
        assert_eq!(
            injector.lookup_type(&TypeShape::String, "url").unwrap(),
            Some(json!("http://example.com"))
        );
    }

    #[test]
    fn narrower_requested_type_is_enforced() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("url").data().to("http://example.com");
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let err = injector.lookup_type(&TypeShape::Integer, "url").unwrap_err();
        assert!(matches!(err, BinderyError::TypeMismatch { .. }));
    }

    #[test]
    fn category_bindings_shadow_common_ones() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("greeting").to("hello");
        group
            .when_in_category("node", "kermit")
            .bind()
            .name("greeting")
            .to("hello kermit");
        let layers = single_layer(group.build());

        let on_kermit = build_injector(
            Capabilities::structural(),
            &[("node", "kermit")],
            layers.clone(),
        );
        assert_eq!(
            on_kermit.lookup("greeting").unwrap(),
            Some(json!("hello kermit"))
        );

        let elsewhere = build_injector(Capabilities::structural(), &[("node", "piggy")], layers);
        assert_eq!(elsewhere.lookup("greeting").unwrap(), Some(json!("hello")));
    }

    #[test]
    fn higher_layers_shadow_lower_ones() {
        let mut site = BindingsFactory::named_bindings("site-group");
        site.bind().name("x").to("site");
        let mut base = BindingsFactory::named_bindings("base-group");
        base.bind().name("x").to("base");
        let injector = build_injector(
            Capabilities::structural(),
            &[],
            vec![
                BindingsFactory::layer("site", vec![site.build()]),
                BindingsFactory::layer("base", vec![base.build()]),
            ],
        );
        assert_eq!(injector.lookup("x").unwrap(), Some(json!("site")));
    }

    #[test]
    fn singleton_evaluation_is_cached() {
        let capabilities =
            Capabilities::structural().with_evaluator(Arc::new(CountingEvaluator::new()));
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("counter").integer().to_evaluation("next");
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        assert_eq!(injector.lookup("counter").unwrap(), Some(json!(1)));
        assert_eq!(injector.lookup("counter").unwrap(), Some(json!(1)));
    }

    #[test]
    fn non_caching_evaluation_reruns_every_lookup() {
        let capabilities =
            Capabilities::structural().with_evaluator(Arc::new(CountingEvaluator::new()));
        let mut group = BindingsFactory::named_bindings("core");
        group
            .bind()
            .name("counter")
            .integer()
            .to_evaluation("next")
            .non_caching();
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        assert_eq!(injector.lookup("counter").unwrap(), Some(json!(1)));
        assert_eq!(injector.lookup("counter").unwrap(), Some(json!(2)));
    }

    #[test]
    fn constant_null_means_not_found() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("nothing").to(Value::Null);
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));
        assert_eq!(injector.lookup("nothing").unwrap(), None);
    }

    #[test]
    fn missing_producer_is_fatal_at_lookup() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("empty").integer();
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let err = injector.lookup("empty").unwrap_err();
        assert!(matches!(err, BinderyError::MissingProducer { .. }));
    }

    #[test]
    fn scalar_typed_multibind_is_unsupported() {
        let mut group = BindingsFactory::named_bindings("core");
        group.multibind("broken").name("b").integer();
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let err = injector.lookup("b").unwrap_err();
        assert!(matches!(err, BinderyError::UnsupportedMultibindType { .. }));
    }

    #[test]
    fn direct_lookup_cycle_is_detected() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("a").to_lookup(TypeShape::Data, "a");
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let err = injector.lookup("a").unwrap_err();
        assert!(matches!(err, BinderyError::LookupCycle { .. }));
    }

    #[test]
    fn transitive_lookup_cycle_is_detected() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("a").to_lookup(TypeShape::Data, "b");
        group.bind().name("b").to_lookup(TypeShape::Data, "a");
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let err = injector.lookup("a").unwrap_err();
        assert!(matches!(err, BinderyError::LookupCycle { .. }));
    }

    #[test]
    fn lookups_recover_after_a_cycle_error() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("a").to_lookup(TypeShape::Data, "a");
        group.bind().name("ok").to(1);
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        assert!(injector.lookup("a").is_err());
        // the guard was released; unrelated lookups still work
        assert_eq!(injector.lookup("ok").unwrap(), Some(json!(1)));
    }

    #[test]
    fn first_found_returns_the_first_non_null() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("fallback").to("fallback-value");
        group.bind().name("choice").to_first_found(vec![
            ProducerDescriptor::lookup(TypeShape::Data, "missing"),
            ProducerDescriptor::lookup(TypeShape::Data, "fallback"),
            ProducerDescriptor::constant(json!("never-reached")),
        ]);
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        assert_eq!(
            injector.lookup("choice").unwrap(),
            Some(json!("fallback-value"))
        );
    }

    #[test]
    fn first_found_with_no_hits_returns_none() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("choice").to_first_found(vec![
            ProducerDescriptor::lookup(TypeShape::Data, "missing-1"),
            ProducerDescriptor::lookup(TypeShape::Data, "missing-2"),
        ]);
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));
        assert_eq!(injector.lookup("choice").unwrap(), None);
    }

    #[test]
    fn hash_lookup_indexes_into_the_result() {
        let mut group = BindingsFactory::named_bindings("core");
        group
            .bind()
            .name("settings")
            .to(json!({"timeout": 30, "retries": 3}));
        group
            .bind()
            .name("timeout")
            .to_hash_lookup(TypeShape::Data, "settings", "timeout");
        group
            .bind()
            .name("absent")
            .to_hash_lookup(TypeShape::Data, "settings", "no-such-key");
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        assert_eq!(injector.lookup("timeout").unwrap(), Some(json!(30)));
        assert_eq!(injector.lookup("absent").unwrap(), None);
    }

    #[test]
    fn instance_producers_construct_registered_types() {
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable("Widget", Arc::new(EchoInstantiable::new("Widget")));
        let capabilities = Capabilities::structural().with_registry(Arc::new(registry));

        let mut group = BindingsFactory::named_bindings("core");
        group
            .bind()
            .name("widget")
            .class("Widget")
            .to_instance_with_args("Widget", vec![ProducerArg::named("size", json!(3))]);
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        assert_eq!(
            injector.lookup_type(&TypeShape::Class("Widget".into()), "widget").unwrap(),
            Some(json!({"class": "Widget", "args": {"size": 3}}))
        );
    }

    #[test]
    fn singleton_instances_are_constructed_once() {
        let counting = Arc::new(CountingInstantiable::default());
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable("Counter", Arc::clone(&counting) as Arc<dyn Instantiable>);
        let capabilities = Capabilities::structural().with_registry(Arc::new(registry));

        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("c").class("Counter").to_instance("Counter");
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        let key = injector.named_key(TypeShape::Class("Counter".into()), "c");
        assert_eq!(injector.lookup_key(&key).unwrap(), Some(json!({"serial": 1})));
        assert_eq!(injector.lookup_key(&key).unwrap(), Some(json!({"serial": 1})));
        assert_eq!(counting.constructed.get(), 1);
    }

    #[test]
    fn non_caching_instances_are_constructed_every_lookup() {
        let counting = Arc::new(CountingInstantiable::default());
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable("Counter", Arc::clone(&counting) as Arc<dyn Instantiable>);
        let capabilities = Capabilities::structural().with_registry(Arc::new(registry));

        let mut group = BindingsFactory::named_bindings("core");
        group
            .bind()
            .name("c")
            .class("Counter")
            .to_instance("Counter")
            .non_caching();
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        let key = injector.named_key(TypeShape::Class("Counter".into()), "c");
        assert_eq!(injector.lookup_key(&key).unwrap(), Some(json!({"serial": 1})));
        assert_eq!(injector.lookup_key(&key).unwrap(), Some(json!({"serial": 2})));
    }

    #[test]
    fn injection_hooks_resolve_through_the_injector() {
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable(
            "Service",
            Arc::new(HookedInstantiable::new("Service", "endpoint")),
        );
        let capabilities = Capabilities::structural().with_registry(Arc::new(registry));

        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("endpoint").to("https://api.example.com");
        group.bind().name("svc").class("Service").to_instance("Service");
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        let key = injector.named_key(TypeShape::Class("Service".into()), "svc");
        assert_eq!(
            injector.lookup_key(&key).unwrap(),
            Some(json!({"class": "Service", "injected": "https://api.example.com"}))
        );
    }

    #[test]
    fn unknown_class_names_suggest_the_closest_registration() {
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable("Widget", Arc::new(EchoInstantiable::new("Widget")));
        let capabilities = Capabilities::structural().with_registry(Arc::new(registry));

        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("w").class("Wdget").to_instance("Wdget");
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        let key = injector.named_key(TypeShape::Class("Wdget".into()), "w");
        let err = injector.lookup_key(&key).unwrap_err();
        let BinderyError::UnknownRegistryEntry { suggestion, .. } = err else {
            panic!("expected a registry error, got {err}");
        };
        assert_eq!(suggestion.as_deref(), Some("Widget"));
    }

    #[test]
    fn assisted_injection_constructs_unbound_classes() {
        let counting = Arc::new(CountingInstantiable::default());
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable("Orphan", Arc::clone(&counting) as Arc<dyn Instantiable>);
        let capabilities = Capabilities::structural().with_registry(Arc::new(registry));

        let group = BindingsFactory::named_bindings("empty");
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        let orphan = TypeShape::Class("Orphan".into());
        assert_eq!(
            injector.lookup_type(&orphan, "").unwrap(),
            Some(json!({"serial": 1}))
        );
        // the assisted producer and its instance are cached under the key
        assert_eq!(
            injector.lookup_type(&orphan, "").unwrap(),
            Some(json!({"serial": 1}))
        );
        assert_eq!(counting.constructed.get(), 1);

        // requesting the producer recomputes the instance
        let producer = injector
            .lookup_producer_type(&orphan, "")
            .unwrap()
            .expect("assisted producer");
        let _ = producer;
        assert_eq!(counting.constructed.get(), 2);
        assert_eq!(
            injector.lookup_type(&orphan, "").unwrap(),
            Some(json!({"serial": 2}))
        );
    }

    #[test]
    fn assisted_injection_requires_an_unnamed_key() {
        let mut registry = InstantiableRegistry::new();
        registry.register_instantiable("Orphan", Arc::new(EchoInstantiable::new("Orphan")));
        let capabilities = Capabilities::structural().with_registry(Arc::new(registry));
        let group = BindingsFactory::named_bindings("empty");
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        assert_eq!(
            injector
                .lookup_type(&TypeShape::Class("Orphan".into()), "named")
                .unwrap(),
            None
        );
    }

    #[test]
    fn assisted_injection_misses_unregistered_classes() {
        let group = BindingsFactory::named_bindings("empty");
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));
        assert_eq!(
            injector
                .lookup_type(&TypeShape::Class("Unknown".into()), "")
                .unwrap(),
            None
        );
    }

    #[test]
    fn singleton_producer_series_advances_across_lookups() {
        let factory = Arc::new(SequenceProducerFactory::new());
        let mut registry = InstantiableRegistry::new();
        registry.register_producer_factory(
            "seq",
            Arc::clone(&factory) as Arc<dyn crate::registry::ProducerFactory>,
        );
        let capabilities = Capabilities::structural().with_registry(Arc::new(registry));

        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("series").integer().to_producer("seq");
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        // the producer is the singleton, not the value
        assert_eq!(injector.lookup("series").unwrap(), Some(json!(1)));
        assert_eq!(injector.lookup("series").unwrap(), Some(json!(2)));
        assert_eq!(factory.created(), 1);

        // a producer request does not restart a singleton series
        let producer = injector.lookup_producer("series").unwrap().unwrap();
        let _ = producer;
        assert_eq!(factory.created(), 1);
        assert_eq!(injector.lookup("series").unwrap(), Some(json!(3)));
    }

    #[test]
    fn non_singleton_producer_series_restarts_per_producer_request() {
        let factory = Arc::new(SequenceProducerFactory::new());
        let mut registry = InstantiableRegistry::new();
        registry.register_producer_factory(
            "seq",
            Arc::clone(&factory) as Arc<dyn crate::registry::ProducerFactory>,
        );
        let capabilities = Capabilities::structural().with_registry(Arc::new(registry));

        let mut group = BindingsFactory::named_bindings("core");
        group
            .bind()
            .name("series")
            .integer()
            .to_producer("seq")
            .non_caching();
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        // produce without an explicit producer request: created lazily once
        assert_eq!(injector.lookup("series").unwrap(), Some(json!(1)));
        assert_eq!(injector.lookup("series").unwrap(), Some(json!(2)));
        assert_eq!(factory.created(), 1);

        // each producer request re-creates the inner producer
        let producer = injector.lookup_producer("series").unwrap().unwrap();
        let _ = producer;
        assert_eq!(factory.created(), 2);
        assert_eq!(injector.lookup("series").unwrap(), Some(json!(1)));
    }

    #[test]
    fn producer_producer_requires_a_factory_instance() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("bad").to_descriptor(crate::bindings::ProducerDescriptor::new(
            crate::bindings::ProducerKind::ProducerProducer {
                producer: Box::new(ProducerDescriptor::constant(json!(1))),
            },
        ));
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let err = injector.lookup("bad").unwrap_err();
        assert!(matches!(err, BinderyError::Configuration { .. }));
    }

    #[test]
    fn transformers_post_process_produced_values() {
        let evaluator = FnEvaluator::new(|expression, context| {
            assert_eq!(expression.source(), "decorate");
            let raw = context.get("value").cloned().unwrap_or(Value::Null);
            let Value::String(text) = raw else {
                return Ok(Value::Null);
            };
            Ok(json!(format!("{text}!")))
        });
        let capabilities = Capabilities::structural().with_evaluator(Arc::new(evaluator));

        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("greeting").string().to("hi").transformer("decorate");
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        assert_eq!(injector.lookup("greeting").unwrap(), Some(json!("hi!")));
    }

    #[test]
    fn produced_values_must_satisfy_the_binding_type() {
        let capabilities = Capabilities::structural()
            .with_evaluator(Arc::new(TableEvaluator::new().with_answer("val", json!("text"))));
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("n").integer().to_evaluation("val");
        let injector = build_injector(capabilities, &[], single_layer(group.build()));

        let err = injector.lookup("n").unwrap_err();
        assert!(matches!(err, BinderyError::TypeMismatch { .. }));
    }

    #[test]
    fn override_injectors_shadow_and_delegate() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("kept").to("original");
        group.bind().name("replaced").to("original");
        let parent = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let child = parent
            .override_with("test-override", |b| {
                b.bind().name("replaced").to("overridden");
            })
            .unwrap();

        assert_eq!(child.lookup("replaced").unwrap(), Some(json!("overridden")));
        assert_eq!(child.lookup("kept").unwrap(), Some(json!("original")));
        // the parent is never mutated
        assert_eq!(parent.lookup("replaced").unwrap(), Some(json!("original")));
    }

    #[test]
    fn delegated_lookups_resolve_nested_lookups_in_the_parent() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("a").to_lookup(TypeShape::Data, "b");
        group.bind().name("b").to(1);
        let parent = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let child = parent
            .override_with("test-override", |b| {
                b.bind().name("b").to_lookup(TypeShape::Data, "a");
            })
            .unwrap();

        // the child's 'a' delegates to the parent, whose nested lookup of
        // 'b' resolves in the parent; the child's 'b' override is not
        // consulted and no cycle forms
        assert_eq!(child.lookup("a").unwrap(), Some(json!(1)));
    }

    #[test]
    fn cycle_guard_spans_parent_delegation() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("a").to_lookup(TypeShape::Data, "a");
        let parent = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let child = parent.override_with("test-override", |_| {}).unwrap();

        // the child has no entry for 'a'; the parent's self-referential
        // binding trips the guard created by the child's call chain
        let err = child.lookup("a").unwrap_err();
        assert!(matches!(err, BinderyError::LookupCycle { .. }));
    }

    #[test]
    fn lookup_producer_returns_the_memoized_producer() {
        let mut group = BindingsFactory::named_bindings("core");
        group.bind().name("answer").integer().to(42);
        let injector = build_injector(Capabilities::structural(), &[], single_layer(group.build()));

        let producer = injector.lookup_producer("answer").unwrap().unwrap();
        assert_eq!(injector.lookup("answer").unwrap(), Some(json!(42)));
        // same memoized producer on a second request
        let again = injector.lookup_producer("answer").unwrap().unwrap();
        assert!(Arc::ptr_eq(&producer, &again));
    }
}
