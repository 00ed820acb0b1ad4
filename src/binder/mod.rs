//! Precedence-aware merging of layered bindings.
//!
//! The binder turns a [`LayeredBindings`] tree and the caller's
//! [`EffectiveCategories`] into one flat, conflict-free map of keys to
//! bindings. Configuration happens in two steps: [`Binder::set_categories`]
//! builds the category precedence table, then [`Binder::set_layers`] merges
//! the layers against it. The configured binder is consumed by
//! [`Injector::new`](crate::injector::Injector::new).
//!
//! # Merge rules
//!
//! Layers are processed from highest to lowest. Within a layer, two
//! bindings for the same key are ranked by effective precedence (the
//! deduplicated, descending-sorted categorization precedences in force at
//! the declaration site); a non-abstract binding always beats an abstract
//! one, and an exact tie is a [`BinderyError::MergeConflict`]. A key already
//! bound by a higher layer discards lower bindings outright - unless the
//! discarded binding is `final`, which is a conflict. Whenever two bindings
//! for one key meet, the survivor counts as having overridden something;
//! after all layers are merged, any `override` binding that never did is
//! reported, as is any `abstract` binding that survived unshadowed.

use crate::bindings::key::{Key, KeyFactory};
use crate::bindings::{Binding, EffectiveCategories, LayeredBindings};
use crate::capabilities::Capabilities;
use crate::config::EngineConfig;
use crate::constants::{
    CATEGORY_PRECEDENCE_BASE, COMMON_CATEGORIZATION, COMMON_CATEGORY_VALUE, COMMON_PRECEDENCE,
};
use crate::core::{BinderyError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

mod layer_processor;


pub(crate) use layer_processor::{CollectedLayer, LayerProcessor, PrecedentedBinding};

/// Effective precedence of a binding.
///
/// A deduplicated, descending-sorted list of categorization precedences;
/// ordering is lexicographic, most significant value first. A binding
/// declared outside any categorized container carries the `common`
/// precedence `[0]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Precedence(Vec<u32>);

impl Precedence {
    /// The `common` precedence, `[0]`.
    #[must_use]
    pub fn common() -> Self {
        Self(vec![COMMON_PRECEDENCE])
    }

    /// Effective precedence for the given stack of active categorization
    /// precedences.
    #[must_use]
    pub fn from_stack(stack: &[u32]) -> Self {
        if stack.is_empty() {
            return Self::common();
        }
        let mut values = stack.to_vec();
        values.sort_unstable_by(|a, b| b.cmp(a));
        values.dedup();
        Self(values)
    }

    /// The ordered precedence values.
    #[must_use]
    pub fn values(&self) -> &[u32] {
        &self.0
    }
}

/// Category precedence assignments for one configuration pass.
#[derive(Debug, Clone)]
pub(crate) struct PrecedenceTable {
    precedence_of: BTreeMap<String, u32>,
    active_value: BTreeMap<String, String>,
}

impl PrecedenceTable {
    fn build(categories: &EffectiveCategories, limit: usize) -> Result<Self> {
        if categories.categories.len() > limit {
            return Err(BinderyError::Configuration {
                message: format!(
                    "{} categorizations exceed the limit of {limit}",
                    categories.categories.len()
                ),
            });
        }

        let mut precedence_of = BTreeMap::new();
        let mut active_value = BTreeMap::new();
        precedence_of.insert(COMMON_CATEGORIZATION.to_string(), COMMON_PRECEDENCE);
        active_value.insert(
            COMMON_CATEGORIZATION.to_string(),
            COMMON_CATEGORY_VALUE.to_string(),
        );

        for (index, category) in categories.categories.iter().enumerate() {
            // index < limit <= CATEGORY_PRECEDENCE_BASE, so this never
            // collides with the common precedence
            let precedence = CATEGORY_PRECEDENCE_BASE - index as u32;
            if precedence_of
                .insert(category.categorization.clone(), precedence)
                .is_some()
            {
                return Err(BinderyError::Configuration {
                    message: format!(
                        "categorization '{}' is defined more than once",
                        category.categorization
                    ),
                });
            }
            active_value.insert(category.categorization.clone(), category.value.clone());
        }
        Ok(Self {
            precedence_of,
            active_value,
        })
    }

    /// Precedence of a categorization, if it is active.
    pub(crate) fn precedence(&self, categorization: &str) -> Option<u32> {
        self.precedence_of.get(categorization).copied()
    }

    /// Whether the active value of `categorization` equals `value`.
    ///
    /// An absent categorization never matches.
    pub(crate) fn matches(&self, categorization: &str, value: &str) -> bool {
        self.active_value.get(categorization).map(String::as_str) == Some(value)
    }
}

/// Where a binding was declared, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOrigin {
    /// Layer name
    pub layer: String,
    /// Named bindings group
    pub bindings: String,
}

impl BindingOrigin {
    pub(crate) fn describe(&self) -> String {
        format!("'{}' in layer '{}'", self.bindings, self.layer)
    }
}

/// One merged binding, before the injector takes ownership.
#[derive(Debug, Clone)]
pub(crate) struct BoundEntry {
    pub precedence: Precedence,
    pub binding: Arc<Binding>,
    pub resolved: bool,
    pub origin: BindingOrigin,
}

impl BoundEntry {
    fn format_binding(&self) -> String {
        format!(
            "binding '{}/{}' in {}",
            self.binding.type_shape, self.binding.name, self.origin.describe()
        )
    }
}

/// Output of the merge: effective entries plus multibind contribution
/// indices.
#[derive(Debug, Default)]
pub(crate) struct ResolvedBindings {
    pub entries: BTreeMap<Key, BoundEntry>,
    pub contributions: BTreeMap<Key, Vec<Key>>,
}

/// Merges layered bindings into the flat map served by an injector.
///
/// ```
/// use bindery::binder::Binder;
/// use bindery::bindings::BindingsFactory;
/// use bindery::capabilities::Capabilities;
/// use bindery::config::EngineConfig;
///
/// let mut bindings = BindingsFactory::named_bindings("defaults");
/// bindings.bind().name("answer").integer().to(42);
/// let layered = BindingsFactory::layered_bindings(vec![BindingsFactory::layer(
///     "base",
///     vec![bindings.build()],
/// )]);
///
/// let mut binder = Binder::new(EngineConfig::default(), Capabilities::structural());
/// binder.set_categories(&BindingsFactory::categories(&[])).unwrap();
/// binder.set_layers(&layered).unwrap();
/// assert!(binder.is_configured());
/// ```
#[derive(Debug)]
pub struct Binder {
    config: EngineConfig,
    capabilities: Capabilities,
    key_factory: KeyFactory,
    categories: Option<EffectiveCategories>,
    table: Option<PrecedenceTable>,
    resolved: Option<ResolvedBindings>,
    anonymous_serial: u64,
}

impl Binder {
    /// Create an unconfigured binder.
    #[must_use]
    pub fn new(config: EngineConfig, capabilities: Capabilities) -> Self {
        let key_factory = KeyFactory::new(
            Arc::clone(&capabilities.type_system),
            config.collapse_data_types,
        );
        Self {
            config,
            capabilities,
            key_factory,
            categories: None,
            table: None,
            resolved: None,
            anonymous_serial: 0,
        }
    }

    /// Establish the active categories and their precedence order.
    ///
    /// Must be called exactly once, before [`set_layers`](Self::set_layers).
    ///
    /// # Errors
    ///
    /// [`BinderyError::Configuration`] when the configuration is invalid,
    /// the category limit is exceeded, a categorization is defined twice,
    /// or categories were already set.
    pub fn set_categories(&mut self, categories: &EffectiveCategories) -> Result<()> {
        self.config.validate()?;
        if self.table.is_some() {
            return Err(BinderyError::Configuration {
                message: "categories are already set".to_string(),
            });
        }
        let table = PrecedenceTable::build(categories, self.config.category_limit)?;
        debug!(
            categorizations = categories.categories.len(),
            "categories configured"
        );
        self.categories = Some(categories.clone());
        self.table = Some(table);
        Ok(())
    }

    /// Merge the layered bindings into one effective map.
    ///
    /// Layers are given highest-precedence first and processed in that
    /// order. Must be called exactly once, after
    /// [`set_categories`](Self::set_categories).
    ///
    /// # Errors
    ///
    /// [`BinderyError::Configuration`] on out-of-order calls;
    /// [`BinderyError::MergeConflict`],
    /// [`BinderyError::AbstractNotOverridden`], or
    /// [`BinderyError::UnresolvedOverride`] when the model cannot be merged.
    pub fn set_layers(&mut self, layered: &LayeredBindings) -> Result<()> {
        let Some(table) = self.table.clone() else {
            return Err(BinderyError::Configuration {
                message: "set_categories must be called before set_layers".to_string(),
            });
        };
        if self.resolved.is_some() {
            return Err(BinderyError::Configuration {
                message: "binder is already configured".to_string(),
            });
        }

        let mut resolved = ResolvedBindings::default();
        for layer in &layered.layers {
            let collected = LayerProcessor::new(&table, &layer.name).collect(layer);
            debug!(
                layer = %layer.name,
                bindings = collected.bindings.len(),
                contributions = collected.contributions.len(),
                "collected layer"
            );
            self.merge_layer(&mut resolved, &layer.name, collected)?;
        }

        for entry in resolved.entries.values() {
            if !entry.resolved {
                return Err(BinderyError::UnresolvedOverride {
                    binding: entry.format_binding(),
                });
            }
        }

        debug!(
            entries = resolved.entries.len(),
            multibinds = resolved.contributions.len(),
            "layers merged"
        );
        self.resolved = Some(resolved);
        Ok(())
    }

    /// Whether both configuration steps have completed.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.resolved.is_some()
    }

    fn next_anonymous_key(&mut self) -> Key {
        let serial = self.anonymous_serial;
        self.anonymous_serial += 1;
        Key::Anonymous { serial }
    }

    /// Reduce one collected layer and fold it into the accumulator.
    fn merge_layer(
        &mut self,
        all: &mut ResolvedBindings,
        layer_name: &str,
        collected: CollectedLayer,
    ) -> Result<()> {
        let mut this_layer: BTreeMap<Key, BoundEntry> = BTreeMap::new();

        for precedented in collected.bindings {
            let key = self.key_factory.binding_key(&precedented.binding);

            // A higher layer already bound this key: discard, but the
            // surviving entry now counts as having overridden something.
            if let Some(higher) = all.entries.get_mut(&key) {
                if precedented.binding.is_final {
                    return Err(conflict(layer_name, higher, &precedented, true));
                }
                trace!(key = %key, "binding shadowed by higher layer");
                higher.resolved = true;
                continue;
            }

            match this_layer.remove(&key) {
                Some(existing) => {
                    let mut winner = highest(layer_name, existing, precedented.into_entry())?;
                    winner.resolved = true;
                    this_layer.insert(key, winner);
                }
                None => {
                    this_layer.insert(key, precedented.into_entry());
                }
            }
        }

        for precedented in collected.contributions {
            let Some(id) = precedented.binding.multibind_id.clone() else {
                continue;
            };
            let anonymous = self.next_anonymous_key();
            this_layer.insert(anonymous.clone(), precedented.into_entry());
            all.contributions
                .entry(KeyFactory::contributions_key(&id))
                .or_default()
                .push(anonymous);
        }

        for (key, entry) in this_layer {
            if entry.binding.is_abstract {
                return Err(BinderyError::AbstractNotOverridden {
                    type_name: entry.binding.type_shape.to_string(),
                    name: entry.binding.name.clone(),
                    bindings: entry.origin.bindings.clone(),
                    layer: entry.origin.layer.clone(),
                });
            }
            if all.entries.insert(key.clone(), entry).is_some() {
                return Err(BinderyError::InternalRedefinition {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        EngineConfig,
        Capabilities,
        KeyFactory,
        Option<EffectiveCategories>,
        Option<ResolvedBindings>,
    ) {
        (
            self.config,
            self.capabilities,
            self.key_factory,
            self.categories,
            self.resolved,
        )
    }
}

/// Pick the binding with the higher effective precedence.
///
/// A non-abstract binding beats an abstract one regardless of precedence;
/// an exact tie is a conflict.
fn highest(layer_name: &str, a: BoundEntry, b: BoundEntry) -> Result<BoundEntry> {
    if a.binding.is_abstract != b.binding.is_abstract {
        return Ok(if a.binding.is_abstract { b } else { a });
    }
    match a.precedence.cmp(&b.precedence) {
        std::cmp::Ordering::Greater => Ok(a),
        std::cmp::Ordering::Less => Ok(b),
        std::cmp::Ordering::Equal => Err(BinderyError::MergeConflict {
            name: a.binding.name.clone(),
            layer: layer_name.to_string(),
            first: a.origin.describe(),
            second: b.origin.describe(),
            finality: finality_note(a.binding.is_final || b.binding.is_final),
        }),
    }
}

/// Conflict between an accumulated entry and a lower-layer binding.
fn conflict(
    layer_name: &str,
    higher: &BoundEntry,
    lower: &PrecedentedBinding,
    final_involved: bool,
) -> BinderyError {
    BinderyError::MergeConflict {
        name: lower.binding.name.clone(),
        layer: layer_name.to_string(),
        first: higher.origin.describe(),
        second: lower.origin.describe(),
        finality: finality_note(final_involved),
    }
}

fn finality_note(final_involved: bool) -> String {
    if final_involved {
        ". Override of a final binding is not allowed".to_string()
    } else {
        String::new()
    }
}
