//! Per-layer collection of bindings with effective precedences.
//!
//! The processor walks one named layer's bindings tree, evaluating
//! categorized containers against the precedence table. While inside a
//! matched container, the predicates' precedence values are pushed on a
//! stack; the effective precedence of any binding underneath is derived
//! from the whole stack. Unmatched containers are skipped with their entire
//! subtree.

use crate::binder::{BindingOrigin, BoundEntry, Precedence, PrecedenceTable};
use crate::bindings::{Binding, BindingsEntry, NamedLayer};
use std::sync::Arc;
use tracing::trace;

/// A binding with its effective precedence, before reduction.
#[derive(Debug, Clone)]
pub(crate) struct PrecedentedBinding {
    pub precedence: Precedence,
    pub binding: Arc<Binding>,
    pub origin: BindingOrigin,
}

impl PrecedentedBinding {
    pub(crate) fn into_entry(self) -> BoundEntry {
        let resolved = !self.binding.is_override;
        BoundEntry {
            precedence: self.precedence,
            binding: self.binding,
            resolved,
            origin: self.origin,
        }
    }
}

/// Everything one layer contributes, split into regular bindings and
/// multibind contributions.
#[derive(Debug, Default)]
pub(crate) struct CollectedLayer {
    pub bindings: Vec<PrecedentedBinding>,
    pub contributions: Vec<PrecedentedBinding>,
}

/// Walks one layer's tree against the precedence table.
pub(crate) struct LayerProcessor<'a> {
    table: &'a PrecedenceTable,
    layer_name: &'a str,
}

impl<'a> LayerProcessor<'a> {
    pub(crate) fn new(table: &'a PrecedenceTable, layer_name: &'a str) -> Self {
        Self { table, layer_name }
    }

    pub(crate) fn collect(&self, layer: &NamedLayer) -> CollectedLayer {
        let mut collected = CollectedLayer::default();
        let mut stack = Vec::new();
        for named in &layer.bindings {
            self.walk(&named.bindings, &mut stack, &named.name, &mut collected);
        }
        collected
    }

    fn walk(
        &self,
        entries: &[BindingsEntry],
        stack: &mut Vec<u32>,
        bindings_name: &str,
        out: &mut CollectedLayer,
    ) {
        for entry in entries {
            match entry {
                BindingsEntry::Binding(binding) => {
                    let precedented = PrecedentedBinding {
                        precedence: Precedence::from_stack(stack),
                        binding: Arc::new(binding.clone()),
                        origin: BindingOrigin {
                            layer: self.layer_name.to_string(),
                            bindings: bindings_name.to_string(),
                        },
                    };
                    if binding.multibind_id.is_some() {
                        out.contributions.push(precedented);
                    } else {
                        out.bindings.push(precedented);
                    }
                }
                BindingsEntry::Categorized(categorized) => {
                    let Some(precedences) = self.match_predicates(categorized) else {
                        trace!(
                            bindings = bindings_name,
                            "categorized bindings skipped, predicates do not match"
                        );
                        continue;
                    };
                    let depth = stack.len();
                    stack.extend(precedences);
                    self.walk(&categorized.bindings, stack, bindings_name, out);
                    stack.truncate(depth);
                }
            }
        }
    }

    /// The predicate precedences when every predicate matches the active
    /// categories, `None` otherwise.
    fn match_predicates(
        &self,
        categorized: &crate::bindings::CategorizedBindings,
    ) -> Option<Vec<u32>> {
        let mut precedences = Vec::with_capacity(categorized.predicates.len());
        for predicate in &categorized.predicates {
            if !self.table.matches(&predicate.categorization, &predicate.value) {
                return None;
            }
            precedences.push(self.table.precedence(&predicate.categorization)?);
        }
        Some(precedences)
    }
}
