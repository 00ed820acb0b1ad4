//! Type shapes and the type-system capability.
//!
//! The engine never inspects host runtime types directly; it reasons about
//! values through the [`TypeSystem`] capability and a closed set of
//! [`TypeShape`]s. `Data` is the generic umbrella shape: scalars, sequences
//! of data, and string-keyed maps of data are all assignable to it, and
//! binding keys declared with a data-compatible type collapse to `Data` so a
//! precise request can still find a generically declared binding.
//!
//! [`StructuralTypeSystem`] is the default implementation, checking values
//! structurally over the JSON value domain. Hosts with a richer runtime type
//! model supply their own implementation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;


/// Closed set of type shapes recognized by the engine.
///
/// `Array` and `Hash` are the two distinguished container shapes; `Class`
/// denotes a host runtime type identified by name. The set is deliberately
/// closed: producers and combinators match exhaustively over it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeShape {
    /// The generic data umbrella: any scalar, array of data, or hash of data.
    Data,
    /// Boolean values.
    Boolean,
    /// Integral numbers.
    Integer,
    /// Floating point numbers.
    Float,
    /// Strings.
    String,
    /// Homogeneous sequences with the given element shape.
    Array(Box<TypeShape>),
    /// String-keyed maps with the given key and element shapes.
    Hash(Box<TypeShape>, Box<TypeShape>),
    /// A host runtime type identified by its registered name.
    Class(String),
}

impl TypeShape {
    /// Shorthand for `Array(Data)`.
    #[must_use]
    pub fn array_of_data() -> Self {
        TypeShape::Array(Box::new(TypeShape::Data))
    }

    /// Shorthand for `Hash(String, Data)`.
    #[must_use]
    pub fn hash_of_data() -> Self {
        TypeShape::Hash(Box::new(TypeShape::String), Box::new(TypeShape::Data))
    }

    /// The element shape of an array or hash shape, if this is one.
    #[must_use]
    pub fn element_shape(&self) -> Option<&TypeShape> {
        match self {
            TypeShape::Array(element) => Some(element),
            TypeShape::Hash(_, element) => Some(element),
            _ => None,
        }
    }

    /// The key shape of a hash shape, if this is one.
    #[must_use]
    pub fn key_shape(&self) -> Option<&TypeShape> {
        match self {
            TypeShape::Hash(key, _) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Data => write!(f, "Data"),
            TypeShape::Boolean => write!(f, "Boolean"),
            TypeShape::Integer => write!(f, "Integer"),
            TypeShape::Float => write!(f, "Float"),
            TypeShape::String => write!(f, "String"),
            TypeShape::Array(element) => write!(f, "Array[{element}]"),
            TypeShape::Hash(key, element) => write!(f, "Hash[{key}, {element}]"),
            TypeShape::Class(name) => write!(f, "Class[{name}]"),
        }
    }
}

/// Capability interface for type reasoning.
///
/// The engine uses this for key collapsing (`assignable` against `Data`),
/// for post-production type checks (`instance_of`), and for error messages
/// (`infer`).
pub trait TypeSystem {
    /// Whether a value of shape `source` may stand in where `target` is
    /// expected.
    fn assignable(&self, target: &TypeShape, source: &TypeShape) -> bool;

    /// The most specific shape describing `value`.
    fn infer(&self, value: &Value) -> TypeShape;

    /// Whether `value` satisfies `shape`.
    fn instance_of(&self, shape: &TypeShape, value: &Value) -> bool;
}

/// Default [`TypeSystem`] checking values structurally.
///
/// `Class` shapes are satisfied by any object value; hosts that can tell
/// their runtime types apart should supply their own implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralTypeSystem;

impl StructuralTypeSystem {
    /// Create a structural type system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn data_compatible(shape: &TypeShape) -> bool {
        match shape {
            TypeShape::Data
            | TypeShape::Boolean
            | TypeShape::Integer
            | TypeShape::Float
            | TypeShape::String => true,
            TypeShape::Array(element) => Self::data_compatible(element),
            TypeShape::Hash(key, element) => {
                matches!(**key, TypeShape::String | TypeShape::Data)
                    && Self::data_compatible(element)
            }
            TypeShape::Class(_) => false,
        }
    }

    fn value_is_data(value: &Value) -> bool {
        match value {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => true,
            Value::Array(items) => items.iter().all(Self::value_is_data),
            Value::Object(map) => map.values().all(Self::value_is_data),
        }
    }

    /// Unify a sequence of shapes into the most specific common shape.
    fn unify(mut shapes: impl Iterator<Item = TypeShape>) -> TypeShape {
        let Some(first) = shapes.next() else {
            return TypeShape::Data;
        };
        if shapes.all(|shape| shape == first) {
            first
        } else {
            TypeShape::Data
        }
    }
}

impl TypeSystem for StructuralTypeSystem {
    fn assignable(&self, target: &TypeShape, source: &TypeShape) -> bool {
        match (target, source) {
            (TypeShape::Data, source) => Self::data_compatible(source),
            (TypeShape::Array(t), TypeShape::Array(s)) => self.assignable(t, s),
            (TypeShape::Hash(tk, tv), TypeShape::Hash(sk, sv)) => {
                self.assignable(tk, sk) && self.assignable(tv, sv)
            }
            (TypeShape::Class(a), TypeShape::Class(b)) => a == b,
            (target, source) => target == source,
        }
    }

    fn infer(&self, value: &Value) -> TypeShape {
        match value {
            Value::Null => TypeShape::Data,
            Value::Bool(_) => TypeShape::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => TypeShape::Integer,
            Value::Number(_) => TypeShape::Float,
            Value::String(_) => TypeShape::String,
            Value::Array(items) => {
                TypeShape::Array(Box::new(Self::unify(items.iter().map(|v| self.infer(v)))))
            }
            Value::Object(map) => TypeShape::Hash(
                Box::new(TypeShape::String),
                Box::new(Self::unify(map.values().map(|v| self.infer(v)))),
            ),
        }
    }

    fn instance_of(&self, shape: &TypeShape, value: &Value) -> bool {
        match shape {
            TypeShape::Data => Self::value_is_data(value),
            TypeShape::Boolean => value.is_boolean(),
            TypeShape::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
            TypeShape::Float => {
                matches!(value, Value::Number(n) if !n.is_i64() && !n.is_u64())
            }
            TypeShape::String => value.is_string(),
            TypeShape::Array(element) => match value {
                Value::Array(items) => items.iter().all(|v| self.instance_of(element, v)),
                _ => false,
            },
            TypeShape::Hash(key, element) => match value {
                Value::Object(map) => {
                    map.keys()
                        .all(|k| self.instance_of(key, &Value::String(k.clone())))
                        && map.values().all(|v| self.instance_of(element, v))
                }
                _ => false,
            },
            TypeShape::Class(_) => value.is_object(),
        }
    }
}
