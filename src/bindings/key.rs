//! Binding keys and the key factory.
//!
//! Keys are the opaque identity under which bindings are merged and looked
//! up. All key construction goes through the [`KeyFactory`] so that the
//! binder and the injector translate types and names identically; in
//! particular the factory owns the `Data` collapsing rule: a named key whose
//! type is assignable to `Data` is keyed under `Data` itself, so a request
//! for a precise subtype still finds a binding declared generically.
//!
//! Multibind contributions are keyed anonymously (a monotonic serial), and
//! each multibind id owns a distinct contributions key under which the
//! binder indexes its contributors.

use crate::bindings::Binding;
use crate::types::{TypeShape, TypeSystem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of a merged binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    /// A type/name pair; the common case.
    Named {
        /// The (possibly collapsed) type shape
        type_shape: TypeShape,
        /// The binding name; empty for unnamed bindings
        name: String,
    },
    /// Index of all contributions made to one multibind.
    Contributions {
        /// The multibind id the contributions target
        multibind_id: String,
    },
    /// Key of a single multibind contribution entry.
    Anonymous {
        /// Monotonic serial assigned during the merge
        serial: u64,
    },
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Named { type_shape, name } => write!(f, "{type_shape}/{name}"),
            Key::Contributions { multibind_id } => write!(f, "contributions/{multibind_id}"),
            Key::Anonymous { serial } => write!(f, "anonymous/{serial}"),
        }
    }
}

/// Builds keys consistently for the binder and the injector.
#[derive(Clone)]
pub struct KeyFactory {
    type_system: Arc<dyn TypeSystem>,
    collapse_data_types: bool,
}

impl KeyFactory {
    /// Create a key factory.
    ///
    /// `collapse_data_types` controls the `Data` collapsing rule; it is
    /// normally taken from the engine configuration.
    pub fn new(type_system: Arc<dyn TypeSystem>, collapse_data_types: bool) -> Self {
        Self {
            type_system,
            collapse_data_types,
        }
    }

    /// Key for a type/name combination.
    ///
    /// Shapes assignable to `Data` collapse to `Data` when collapsing is
    /// enabled; `Class` shapes never collapse.
    #[must_use]
    pub fn named_key(&self, type_shape: TypeShape, name: &str) -> Key {
        let type_shape = if self.collapse_data_types
            && self.type_system.assignable(&TypeShape::Data, &type_shape)
        {
            TypeShape::Data
        } else {
            type_shape
        };
        Key::Named {
            type_shape,
            name: name.to_string(),
        }
    }

    /// Key for a `Data`-typed name.
    #[must_use]
    pub fn data_key(&self, name: &str) -> Key {
        Key::Named {
            type_shape: TypeShape::Data,
            name: name.to_string(),
        }
    }

    /// Key under which `binding` is merged.
    #[must_use]
    pub fn binding_key(&self, binding: &Binding) -> Key {
        self.named_key(binding.type_shape.clone(), &binding.name)
    }

    /// The contributions key owned by multibind `id`.
    #[must_use]
    pub fn contributions_key(id: &str) -> Key {
        Key::Contributions {
            multibind_id: id.to_string(),
        }
    }

    /// Whether `key` is a contributions key.
    #[must_use]
    pub fn is_contributions_key(key: &Key) -> bool {
        matches!(key, Key::Contributions { .. })
    }

    /// The multibind id a contributions key refers to.
    #[must_use]
    pub fn contributions_key_to_id(key: &Key) -> Option<&str> {
        match key {
            Key::Contributions { multibind_id } => Some(multibind_id),
            _ => None,
        }
    }
}

impl fmt::Debug for KeyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFactory")
            .field("collapse_data_types", &self.collapse_data_types)
            .finish_non_exhaustive()
    }
}
