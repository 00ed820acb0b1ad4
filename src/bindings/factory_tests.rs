#[cfg(test)]
mod tests {
    use crate::bindings::{
        BindingsEntry, BindingsFactory, ConflictResolution, HashMultibindOptions,
        ProducerDescriptor, ProducerKind,
    };
    use crate::types::TypeShape;
    use serde_json::json;

    fn first_binding(built: &crate::bindings::NamedBindings) -> &crate::bindings::Binding {
        match &built.bindings[0] {
            BindingsEntry::Binding(binding) => binding,
            BindingsEntry::Categorized(_) => panic!("expected a binding entry"),
        }
    }

    #[test]
    fn builds_constant_bindings() {
        let mut group = BindingsFactory::named_bindings("g");
        group.bind().name("answer").integer().to(42);
        let built = group.build();

        assert_eq!(built.name, "g");
        let binding = first_binding(&built);
        assert_eq!(binding.name, "answer");
        assert_eq!(binding.type_shape, TypeShape::Integer);
        assert_eq!(
            binding.producer,
            Some(ProducerDescriptor::constant(json!(42)))
        );
    }

    #[test]
    fn builds_categorized_subtrees() {
        let mut group = BindingsFactory::named_bindings("g");
        group
            .when_in_categories(&[("node", "kermit"), ("environment", "dev")])
            .bind()
            .name("x")
            .to("special");
        let built = group.build();

        let BindingsEntry::Categorized(categorized) = &built.bindings[0] else {
            panic!("expected a categorized entry");
        };
        assert_eq!(categorized.predicates.len(), 2);
        assert_eq!(categorized.predicates[0].categorization, "node");
        assert_eq!(categorized.predicates[1].value, "dev");
        assert!(matches!(&categorized.bindings[0], BindingsEntry::Binding(_)));
    }

    #[test]
    fn nested_categorized_subtrees_nest() {
        let mut group = BindingsFactory::named_bindings("g");
        group
            .when_in_category("os", "linux")
            .when_in_category("environment", "dev")
            .bind()
            .name("x")
            .to(1);
        let built = group.build();

        let BindingsEntry::Categorized(outer) = &built.bindings[0] else {
            panic!("expected a categorized entry");
        };
        let BindingsEntry::Categorized(inner) = &outer.bindings[0] else {
            panic!("expected a nested categorized entry");
        };
        assert_eq!(inner.predicates[0].categorization, "environment");
    }

    #[test]
    fn multibind_and_contribution_ids_are_set() {
        let mut group = BindingsFactory::named_bindings("g");
        group.multibind("handlers").name("all").array_of_data();
        group.bind_in_multibind("handlers").name("file").to("file-handler");
        let built = group.build();

        let declaration = first_binding(&built);
        assert_eq!(declaration.multibind.as_deref(), Some("handlers"));
        assert_eq!(declaration.producer, None);

        let BindingsEntry::Binding(contribution) = &built.bindings[1] else {
            panic!("expected a binding entry");
        };
        assert_eq!(contribution.multibind_id.as_deref(), Some("handlers"));
    }

    #[test]
    fn flags_are_set() {
        let mut group = BindingsFactory::named_bindings("g");
        group
            .bind()
            .name("x")
            .mark_override()
            .mark_abstract()
            .mark_final();
        let built = group.build();

        let binding = first_binding(&built);
        assert!(binding.is_override);
        assert!(binding.is_abstract);
        assert!(binding.is_final);
    }

    #[test]
    fn non_caching_wraps_the_producer() {
        let mut group = BindingsFactory::named_bindings("g");
        group.bind().name("x").to(1).non_caching();
        let built = group.build();

        let binding = first_binding(&built);
        let Some(descriptor) = &binding.producer else {
            panic!("expected a producer");
        };
        assert!(matches!(descriptor.kind, ProducerKind::NonCaching { .. }));
    }

    #[test]
    fn transformer_attaches_before_or_after_producer() {
        let mut group = BindingsFactory::named_bindings("g");
        group.bind().name("early").transformer("value").to(1);
        group.bind().name("late").to(2).transformer("value");
        let built = group.build();

        for entry in &built.bindings {
            let BindingsEntry::Binding(binding) = entry else {
                panic!("expected binding entries");
            };
            let descriptor = binding.producer.as_ref().expect("producer set");
            assert!(descriptor.transformer.is_some(), "{}", binding.name);
        }
    }

    #[test]
    fn hash_multibind_options_flow_through() {
        let mut group = BindingsFactory::named_bindings("g");
        group
            .multibind("settings")
            .name("all-settings")
            .hash_of_data()
            .to_hash_multibind(HashMultibindOptions {
                conflict_resolution: ConflictResolution::Append,
                ..HashMultibindOptions::default()
            });
        let built = group.build();

        let binding = first_binding(&built);
        let Some(ProducerDescriptor {
            kind: ProducerKind::HashMultibind { options },
            ..
        }) = &binding.producer
        else {
            panic!("expected a hash multibind producer");
        };
        assert_eq!(options.conflict_resolution, ConflictResolution::Append);
    }

    #[test]
    fn layered_helpers_preserve_order() {
        let mut high = BindingsFactory::named_bindings("high");
        high.bind().name("x").to(1);
        let mut low = BindingsFactory::named_bindings("low");
        low.bind().name("x").to(2);

        let layered = BindingsFactory::layered_bindings(vec![
            BindingsFactory::layer("site", vec![high.build()]),
            BindingsFactory::layer("base", vec![low.build()]),
        ]);
        assert_eq!(layered.layers[0].name, "site");
        assert_eq!(layered.layers[1].name, "base");
    }

    #[test]
    fn categories_helper_preserves_order() {
        let categories =
            BindingsFactory::categories(&[("node", "kermit"), ("environment", "dev")]);
        assert_eq!(categories.categories[0].categorization, "node");
        assert_eq!(categories.categories[1].value, "dev");
    }

    #[test]
    fn model_round_trips_through_serde() {
        let mut group = BindingsFactory::named_bindings("g");
        group.bind().name("answer").integer().to(42);
        group
            .when_in_category("os", "linux")
            .bind()
            .name("path")
            .string()
            .to("/usr/bin");
        let built = group.build();

        let text = serde_json::to_string(&built).unwrap();
        let back: crate::bindings::NamedBindings = serde_json::from_str(&text).unwrap();
        assert_eq!(back, built);
    }
}
