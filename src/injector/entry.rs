//! Injector entry cells.

use crate::binder::{BindingOrigin, BoundEntry, Precedence};
use crate::bindings::Binding;
use crate::producers::Producer;
use std::fmt;
use std::sync::Arc;

/// One resolved key served by the injector.
///
/// Created from the binder's merged output (or lazily, for assisted
/// injection); the producer slot is memoized on first lookup and lives as
/// long as the injector.
pub struct InjectorEntry {
    /// Effective precedence the binding resolved at.
    pub precedence: Precedence,
    /// The effective binding.
    pub binding: Arc<Binding>,
    /// Whether override bookkeeping completed for this entry.
    pub resolved: bool,
    /// Where the binding was declared.
    pub origin: BindingOrigin,
    /// Memoized producer, filled on first lookup.
    pub(crate) cached_producer: Option<Arc<dyn Producer>>,
}

impl From<BoundEntry> for InjectorEntry {
    fn from(entry: BoundEntry) -> Self {
        Self {
            precedence: entry.precedence,
            binding: entry.binding,
            resolved: entry.resolved,
            origin: entry.origin,
            cached_producer: None,
        }
    }
}

impl fmt::Debug for InjectorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectorEntry")
            .field("precedence", &self.precedence)
            .field("binding", &self.binding)
            .field("resolved", &self.resolved)
            .field("origin", &self.origin)
            .field("cached_producer", &self.cached_producer.as_ref().map(|_| "<producer>"))
            .finish()
    }
}

/// Cell in the injector's entry map.
///
/// Misses are cached as `NotFound` markers so repeated lookups of unbound
/// keys stay cheap.
#[derive(Debug)]
pub(crate) enum EntryCell {
    Bound(InjectorEntry),
    NotFound,
}
