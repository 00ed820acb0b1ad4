//! Full binder-to-injector scenarios.

use crate::common::{init_tracing, injector, try_injector};
use bindery::bindings::BindingsFactory;
use bindery::core::BinderyError;
use bindery::types::TypeShape;
use serde_json::json;

#[test]
fn constant_binding_resolves_through_the_full_stack() {
    init_tracing();
    let mut base = BindingsFactory::named_bindings("base-bindings");
    base.bind().name("answer").integer().to(42);

    let injector = injector(
        &[],
        vec![BindingsFactory::layer("base", vec![base.build()])],
    );
    assert_eq!(
        injector.lookup_type(&TypeShape::Integer, "answer").unwrap(),
        Some(json!(42))
    );
}

#[test]
fn override_without_anything_to_override_is_rejected() {
    init_tracing();
    let mut site = BindingsFactory::named_bindings("site-bindings");
    site.bind().name("answer").integer().to(43).mark_override();

    let err = try_injector(
        &[],
        vec![BindingsFactory::layer("site", vec![site.build()])],
    )
    .unwrap_err();
    assert!(matches!(err, BinderyError::UnresolvedOverride { .. }));
}

#[test]
fn higher_layer_binding_wins_over_base() {
    init_tracing();
    let mut base = BindingsFactory::named_bindings("base-bindings");
    base.bind().name("answer").integer().to(42);
    let mut site = BindingsFactory::named_bindings("site-bindings");
    site.bind().name("answer").integer().to(43);

    let injector = injector(
        &[],
        vec![
            BindingsFactory::layer("site", vec![site.build()]),
            BindingsFactory::layer("base", vec![base.build()]),
        ],
    );
    assert_eq!(injector.lookup("answer").unwrap(), Some(json!(43)));
}

#[test]
fn override_flag_resolves_against_a_base_binding() {
    init_tracing();
    let mut base = BindingsFactory::named_bindings("base-bindings");
    base.bind().name("answer").integer().to(42);
    let mut site = BindingsFactory::named_bindings("site-bindings");
    site.bind().name("answer").integer().to(43).mark_override();

    let injector = injector(
        &[],
        vec![
            BindingsFactory::layer("site", vec![site.build()]),
            BindingsFactory::layer("base", vec![base.build()]),
        ],
    );
    assert_eq!(injector.lookup("answer").unwrap(), Some(json!(43)));
}

#[test]
fn categories_select_environment_specific_values() {
    init_tracing();
    let build = || {
        let mut app = BindingsFactory::named_bindings("app-bindings");
        app.bind().name("db-host").string().to("localhost");
        app.when_in_category("environment", "production")
            .bind()
            .name("db-host")
            .string()
            .to("db.internal");
        app.when_in_categories(&[("environment", "production"), ("node", "edge-1")])
            .bind()
            .name("db-host")
            .string()
            .to("db-edge.internal");
        vec![BindingsFactory::layer("app", vec![app.build()])]
    };

    let dev = injector(&[("environment", "dev"), ("node", "edge-1")], build());
    assert_eq!(dev.lookup("db-host").unwrap(), Some(json!("localhost")));

    let prod = injector(&[("environment", "production"), ("node", "other")], build());
    assert_eq!(prod.lookup("db-host").unwrap(), Some(json!("db.internal")));

    let prod_edge = injector(
        &[("environment", "production"), ("node", "edge-1")],
        build(),
    );
    assert_eq!(
        prod_edge.lookup("db-host").unwrap(),
        Some(json!("db-edge.internal"))
    );
}

#[test]
fn multibind_aggregates_across_the_model() {
    init_tracing();
    let mut app = BindingsFactory::named_bindings("app-bindings");
    app.multibind("extensions").name("extensions").hash_of_data();
    app.bind_in_multibind("extensions").name("auth").to("auth-plugin");
    app.when_in_category("os", "linux")
        .bind_in_multibind("extensions")
        .name("fs")
        .to("posix-fs");
    app.when_in_category("os", "windows")
        .bind_in_multibind("extensions")
        .name("fs")
        .to("win-fs");

    let injector = injector(
        &[("os", "linux")],
        vec![BindingsFactory::layer("app", vec![app.build()])],
    );
    assert_eq!(
        injector.lookup("extensions").unwrap(),
        Some(json!({"auth": "auth-plugin", "fs": "posix-fs"}))
    );
}

#[test]
fn override_injector_layers_on_top_of_a_running_system() {
    init_tracing();
    let mut app = BindingsFactory::named_bindings("app-bindings");
    app.bind().name("greeting").to("hello");
    app.bind().name("subject").to("world");

    let parent = injector(
        &[],
        vec![BindingsFactory::layer("app", vec![app.build()])],
    );
    let child = parent
        .override_with("test-fixture", |b| {
            b.bind().name("subject").to("tests");
        })
        .unwrap();

    assert_eq!(child.lookup("greeting").unwrap(), Some(json!("hello")));
    assert_eq!(child.lookup("subject").unwrap(), Some(json!("tests")));
    assert_eq!(parent.lookup("subject").unwrap(), Some(json!("world")));
}

#[test]
fn lookups_of_unbound_names_stay_null_across_layers() {
    init_tracing();
    let mut app = BindingsFactory::named_bindings("app-bindings");
    app.bind().name("bound").to(1);
    let parent = injector(
        &[],
        vec![BindingsFactory::layer("app", vec![app.build()])],
    );
    let child = parent.override_with("empty-override", |_| {}).unwrap();

    assert_eq!(child.lookup("unbound").unwrap(), None);
    assert_eq!(child.lookup("bound").unwrap(), Some(json!(1)));
}
