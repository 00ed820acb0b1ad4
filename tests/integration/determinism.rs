//! Identical inputs must produce identical results, run after run.

use crate::common::{init_tracing, injector, try_injector};
use bindery::bindings::{BindingsFactory, NamedLayer};
use bindery::core::BinderyError;
use serde_json::Value;

fn scenario_layers() -> Vec<NamedLayer> {
    let mut site = BindingsFactory::named_bindings("site-bindings");
    site.bind().name("pool").integer().to(32);
    site.bind_in_multibind("plugins").name("metrics").to("metrics-plugin");

    let mut base = BindingsFactory::named_bindings("base-bindings");
    base.bind().name("pool").integer().to(4);
    base.bind().name("region").string().to("eu-west-1");
    base.multibind("plugins").name("plugins").array_of_data();
    base.bind_in_multibind("plugins").name("auth").to("auth-plugin");
    base.when_in_category("environment", "production")
        .bind_in_multibind("plugins")
        .name("audit")
        .to("audit-plugin");

    vec![
        BindingsFactory::layer("site", vec![site.build()]),
        BindingsFactory::layer("base", vec![base.build()]),
    ]
}

const CATEGORIES: &[(&str, &str)] = &[("environment", "production"), ("node", "edge-1")];

fn snapshot() -> Vec<(String, Option<Value>)> {
    let injector = injector(CATEGORIES, scenario_layers());
    ["pool", "region", "plugins", "unbound"]
        .iter()
        .map(|name| {
            (
                (*name).to_string(),
                injector.lookup(name).expect("lookup should not error"),
            )
        })
        .collect()
}

#[test]
fn repeated_runs_return_identical_values() {
    init_tracing();
    let first = snapshot();
    for _ in 0..5 {
        assert_eq!(snapshot(), first);
    }
}

#[test]
fn repeated_lookups_on_one_injector_are_stable() {
    init_tracing();
    let injector = injector(CATEGORIES, scenario_layers());
    let first = injector.lookup("plugins").unwrap();
    for _ in 0..5 {
        assert_eq!(injector.lookup("plugins").unwrap(), first);
    }
}

#[test]
fn multibind_order_is_descending_precedence_with_stable_ties() {
    init_tracing();
    let injector = injector(CATEGORIES, scenario_layers());
    let Some(Value::Array(plugins)) = injector.lookup("plugins").unwrap() else {
        panic!("expected the plugins aggregate");
    };
    // audit (environment category, precedence 1000) first, then the common
    // contributions in declaration order: site layer before base layer
    assert_eq!(
        plugins,
        vec![
            Value::from("audit-plugin"),
            Value::from("metrics-plugin"),
            Value::from("auth-plugin"),
        ]
    );
}

#[test]
fn identical_conflicts_report_identical_errors() {
    init_tracing();
    let conflicting = || {
        let mut group = BindingsFactory::named_bindings("conflict-group");
        group.bind().name("x").to(1);
        group.bind().name("x").to(2);
        vec![BindingsFactory::layer("base", vec![group.build()])]
    };

    let first = try_injector(&[], conflicting()).unwrap_err();
    let second = try_injector(&[], conflicting()).unwrap_err();
    assert!(matches!(first, BinderyError::MergeConflict { .. }));
    assert_eq!(first, second);
}
