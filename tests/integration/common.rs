//! Shared helpers for the integration suite.

use bindery::binder::Binder;
use bindery::bindings::{BindingsFactory, NamedLayer};
use bindery::capabilities::Capabilities;
use bindery::config::EngineConfig;
use bindery::core::BinderyError;
use bindery::injector::Injector;
use std::sync::Arc;

/// Build an injector over the given categories and layers, panicking on
/// configuration errors.
pub fn injector(categories: &[(&str, &str)], layers: Vec<NamedLayer>) -> Arc<Injector> {
    try_injector(categories, layers).expect("configuration should succeed")
}

/// Build an injector, surfacing configuration and merge errors.
pub fn try_injector(
    categories: &[(&str, &str)],
    layers: Vec<NamedLayer>,
) -> Result<Arc<Injector>, BinderyError> {
    let mut binder = Binder::new(EngineConfig::default(), Capabilities::structural());
    binder.set_categories(&BindingsFactory::categories(categories))?;
    binder.set_layers(&BindingsFactory::layered_bindings(layers))?;
    Injector::new(binder)
}

/// Install a tracing subscriber once so `RUST_LOG` filters test output.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
