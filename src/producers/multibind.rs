//! Multibind aggregation producers.
//!
//! A multibinding collects every contribution declared with its id and
//! assembles them into one array or hash value. Contributions arrive in
//! descending precedence order; the options decide how same-named
//! contributions are resolved. Aggregation is all-or-nothing: any policy
//! violation or type mismatch aborts the whole production.

use crate::binder::Precedence;
use crate::bindings::key::{Key, KeyFactory};
use crate::bindings::{
    ArrayMultibindOptions, Binding, ConflictResolution, Flatten, HashMultibindOptions,
};
use crate::core::{BinderyError, Result};
use crate::injector::Production;
use crate::producers::Producer;
use crate::types::{TypeShape, TypeSystem};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Assembles array-typed multibind values.
#[derive(Debug)]
pub struct ArrayMultibindProducer {
    multibind_id: String,
    multibind_name: String,
    full_shape: TypeShape,
    element_shape: TypeShape,
    options: ArrayMultibindOptions,
}

impl ArrayMultibindProducer {
    /// Build the aggregator for `binding`, which must be an array-typed
    /// multibinding.
    pub(crate) fn new(binding: &Binding, options: ArrayMultibindOptions) -> Result<Self> {
        let multibind_id = multibind_id(binding)?;
        let TypeShape::Array(element) = &binding.type_shape else {
            return Err(BinderyError::UnsupportedMultibindType {
                name: binding.name.clone(),
                type_shape: binding.type_shape.to_string(),
            });
        };
        Ok(Self {
            multibind_id,
            multibind_name: binding.name.clone(),
            full_shape: binding.type_shape.clone(),
            element_shape: (**element).clone(),
            options,
        })
    }

    /// A contribution value must satisfy the element type or the full
    /// multibind type.
    fn assert_element(&self, type_system: &dyn TypeSystem, value: &Value) -> Result<()> {
        if type_system.instance_of(&self.element_shape, value)
            || type_system.instance_of(&self.full_shape, value)
        {
            return Ok(());
        }
        Err(BinderyError::TypeMismatch {
            subject: format!(
                "contribution to multibind '{}' ('{}')",
                self.multibind_id, self.multibind_name
            ),
            expected: self.element_shape.to_string(),
            actual: type_system.infer(value).to_string(),
        })
    }
}

impl Producer for ArrayMultibindProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        let contributions =
            production.get_contributions(&KeyFactory::contributions_key(&self.multibind_id));

        let mut seen: BTreeMap<String, Precedence> = BTreeMap::new();
        let mut included: Vec<Key> = Vec::new();
        for contribution in &contributions {
            let name = contribution.binding.name.clone();
            let priority = if name.is_empty() {
                self.options.priority_on_unnamed
            } else {
                self.options.priority_on_named
            };
            match seen.get(&name).cloned() {
                Some(first_precedence) if priority => {
                    if first_precedence == contribution.precedence {
                        return Err(BinderyError::DuplicateContribution {
                            multibind: self.multibind_id.clone(),
                            name,
                        });
                    }
                    // contributions arrive in descending order; a later
                    // same-named entry is strictly lower and loses
                }
                _ => {
                    seen.entry(name).or_insert_with(|| contribution.precedence.clone());
                    included.push(contribution.key.clone());
                }
            }
        }

        let mut values = Vec::with_capacity(included.len());
        for key in included {
            let value = production.lookup_key(&key)?.unwrap_or(Value::Null);
            self.assert_element(production.type_system(), &value)?;
            values.push(value);
        }

        let values = flatten_values(values, flatten_limit(self.options.flatten));
        let values = if self.options.uniq {
            unique_values(values)
        } else {
            values
        };
        Ok(Some(Value::Array(values)))
    }
}

/// Assembles hash-typed multibind values.
#[derive(Debug)]
pub struct HashMultibindProducer {
    multibind_id: String,
    multibind_name: String,
    key_shape: TypeShape,
    element_shape: TypeShape,
    options: HashMultibindOptions,
}

impl HashMultibindProducer {
    /// Build the aggregator for `binding`, which must be a hash-typed
    /// multibinding.
    ///
    /// The `append` policy requires an array- or data-compatible element
    /// type; this is validated here, not at production time.
    pub(crate) fn new(binding: &Binding, options: HashMultibindOptions) -> Result<Self> {
        let multibind_id = multibind_id(binding)?;
        let TypeShape::Hash(key, element) = &binding.type_shape else {
            return Err(BinderyError::UnsupportedMultibindType {
                name: binding.name.clone(),
                type_shape: binding.type_shape.to_string(),
            });
        };
        if options.conflict_resolution == ConflictResolution::Append
            && !matches!(**element, TypeShape::Array(_) | TypeShape::Data)
        {
            return Err(BinderyError::MultibindPolicy {
                multibind: multibind_id,
                message: format!(
                    "conflict resolution 'append' requires an array- or data-compatible \
                     element type, got '{element}'"
                ),
            });
        }
        Ok(Self {
            multibind_id,
            multibind_name: binding.name.clone(),
            key_shape: (**key).clone(),
            element_shape: (**element).clone(),
            options,
        })
    }

    fn assert_key(&self, type_system: &dyn TypeSystem, name: &str) -> Result<()> {
        let key_value = Value::String(name.to_string());
        if type_system.instance_of(&self.key_shape, &key_value) {
            return Ok(());
        }
        Err(BinderyError::TypeMismatch {
            subject: format!(
                "key contribution '{name}' to multibind '{}'",
                self.multibind_id
            ),
            expected: self.key_shape.to_string(),
            actual: type_system.infer(&key_value).to_string(),
        })
    }

    fn assert_element(&self, type_system: &dyn TypeSystem, name: &str, value: &Value) -> Result<()> {
        let append = self.options.conflict_resolution == ConflictResolution::Append;
        let matches_element = type_system.instance_of(&self.element_shape, value)
            || (append
                && match &self.element_shape {
                    // append wraps values in arrays, so plain elements are fine
                    TypeShape::Array(inner) => type_system.instance_of(inner, value),
                    _ => false,
                });
        if matches_element {
            return Ok(());
        }
        Err(BinderyError::TypeMismatch {
            subject: format!(
                "contribution '{name}' to multibind '{}' ('{}')",
                self.multibind_id, self.multibind_name
            ),
            expected: self.element_shape.to_string(),
            actual: type_system.infer(value).to_string(),
        })
    }

    /// Fold a lower-precedence value into an existing entry under the
    /// `append` or `merge` policy.
    fn combine(&self, existing: &mut Value, lower: Value, name: &str) -> Result<()> {
        match self.options.conflict_resolution {
            ConflictResolution::Append => {
                let mut items = match existing.take() {
                    Value::Array(items) => items,
                    single => vec![single],
                };
                items.push(lower);
                let items = flatten_values(items, flatten_limit(self.options.flatten));
                let items = if self.options.uniq {
                    unique_values(items)
                } else {
                    items
                };
                *existing = Value::Array(items);
                Ok(())
            }
            ConflictResolution::Merge => {
                let (Value::Object(higher), Value::Object(lower_map)) = (&*existing, &lower)
                else {
                    return Err(BinderyError::MultibindPolicy {
                        multibind: self.multibind_id.clone(),
                        message: format!(
                            "conflict resolution 'merge' requires hash values, \
                             but contribution '{name}' is not a hash"
                        ),
                    });
                };
                // lower-precedence keys never overwrite higher ones
                let mut merged = lower_map.clone();
                for (key, value) in higher {
                    merged.insert(key.clone(), value.clone());
                }
                *existing = Value::Object(merged);
                Ok(())
            }
            _ => unreachable!("combine is only called for append/merge"),
        }
    }
}

impl Producer for HashMultibindProducer {
    fn produce(&self, production: &mut Production<'_>) -> Result<Option<Value>> {
        let contributions =
            production.get_contributions(&KeyFactory::contributions_key(&self.multibind_id));

        let mut seen: BTreeMap<String, Precedence> = BTreeMap::new();
        let mut included: Vec<(Key, String)> = Vec::new();
        for contribution in &contributions {
            let name = contribution.binding.name.clone();
            if name.is_empty() {
                return Err(BinderyError::MultibindPolicy {
                    multibind: self.multibind_id.clone(),
                    message: "a hash multibind contribution must have a name".to_string(),
                });
            }
            match seen.get(&name).cloned() {
                Some(first_precedence) => match self.options.conflict_resolution {
                    ConflictResolution::Priority => {
                        if first_precedence == contribution.precedence {
                            return Err(BinderyError::MultibindPolicy {
                                multibind: self.multibind_id.clone(),
                                message: format!(
                                    "duplicate contribution '{name}' at equal precedence"
                                ),
                            });
                        }
                    }
                    ConflictResolution::Ignore => {}
                    ConflictResolution::Error => {
                        return Err(BinderyError::MultibindPolicy {
                            multibind: self.multibind_id.clone(),
                            message: format!("duplicate contribution '{name}'"),
                        });
                    }
                    ConflictResolution::Append | ConflictResolution::Merge => {
                        included.push((contribution.key.clone(), name));
                    }
                },
                None => {
                    seen.insert(name.clone(), contribution.precedence.clone());
                    included.push((contribution.key.clone(), name));
                }
            }
        }

        let mut result = Map::new();
        for (key, name) in included {
            let value = production.lookup_key(&key)?.unwrap_or(Value::Null);
            self.assert_key(production.type_system(), &name)?;
            self.assert_element(production.type_system(), &name, &value)?;
            match result.get_mut(&name) {
                Some(existing) => self.combine(existing, value, &name)?,
                None => {
                    let initial =
                        if self.options.conflict_resolution == ConflictResolution::Append {
                            Value::Array(vec![value])
                        } else {
                            value
                        };
                    result.insert(name, initial);
                }
            }
        }
        Ok(Some(Value::Object(result)))
    }
}

fn multibind_id(binding: &Binding) -> Result<String> {
    binding
        .multibind
        .clone()
        .ok_or_else(|| BinderyError::Configuration {
            message: format!(
                "binding '{}' carries a multibind producer but declares no multibind id",
                binding.name
            ),
        })
}

fn flatten_limit(flatten: Option<Flatten>) -> usize {
    match flatten {
        None | Some(Flatten::Bool(false)) => 0,
        Some(Flatten::Bool(true)) => usize::MAX,
        Some(Flatten::Depth(depth)) => depth as usize,
    }
}

fn flatten_values(values: Vec<Value>, depth: usize) -> Vec<Value> {
    if depth == 0 {
        return values;
    }
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Array(items) => out.extend(flatten_values(items, depth - 1)),
            other => out.push(other),
        }
    }
    out
}

fn unique_values(values: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
