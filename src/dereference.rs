//! `$ref` dereferencing.
//!
//! [`Oas`](crate::Oas) hands its definition to a [`Dereferencer`] exactly once.
//! The built-in [`LocalDereferencer`] inlines local `#/...` pointers; circular
//! and external references are left as literal `$ref` objects.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::Result;
use crate::refs::{escape_token, resolve_pointer};

/// Extension key naming the component a schema was inlined from.
pub const PROVENANCE_KEY: &str = "x-ref-name";

/// Options for [`Oas::dereference`](crate::Oas::dereference).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DereferenceOptions {
    /// Record the component name as the schema `title` instead of
    /// [`PROVENANCE_KEY`]. Any existing `title` is overwritten.
    pub preserve_ref_as_json_schema_title: bool,
}

/// Replaces `$ref` pointers with the content they name.
///
/// Implementations must leave circular references as literal `$ref` objects
/// and must not resolve anything outside the document.
#[async_trait]
pub trait Dereferencer: Send + Sync {
    async fn dereference(&self, definition: Value) -> Result<Value>;
}

/// Tag every named schema under `components.schemas` with its name, so the
/// name survives inlining.
pub fn tag_component_schemas(definition: &mut Value, options: &DereferenceOptions) {
    let Some(schemas) = definition
        .pointer_mut("/components/schemas")
        .and_then(Value::as_object_mut)
    else {
        return;
    };
    for (name, schema) in schemas.iter_mut() {
        let Some(schema) = schema.as_object_mut() else {
            continue;
        };
        let key = if options.preserve_ref_as_json_schema_title {
            "title"
        } else {
            PROVENANCE_KEY
        };
        schema.insert(key.to_string(), Value::String(name.clone()));
    }
}

/// Rebuild the `$ref` a tagged schema was inlined from.
#[must_use]
pub fn provenance_ref(schema: &Value, options: &DereferenceOptions) -> Option<String> {
    let key = if options.preserve_ref_as_json_schema_title {
        "title"
    } else {
        PROVENANCE_KEY
    };
    schema
        .get(key)
        .and_then(Value::as_str)
        .map(|name| format!("#/components/schemas/{}", escape_token(name)))
}

/// In-process dereferencer for local pointers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDereferencer;

impl LocalDereferencer {
    /// Synchronous form of [`Dereferencer::dereference`].
    #[must_use]
    pub fn dereference_value(&self, definition: &Value) -> Value {
        let mut resolver = Resolver {
            root: definition,
            trail: Vec::new(),
            cache: HashMap::new(),
            cycles: 0,
        };
        let resolved = resolver.resolve(definition, "");
        debug!(
            cached = resolver.cache.len(),
            circular = resolver.cycles,
            "dereferenced definition"
        );
        resolved
    }
}

#[async_trait]
impl Dereferencer for LocalDereferencer {
    async fn dereference(&self, definition: Value) -> Result<Value> {
        Ok(self.dereference_value(&definition))
    }
}

struct Resolver<'a> {
    root: &'a Value,
    /// Pointer locations each followed `$ref` was found at, outermost first.
    trail: Vec<String>,
    /// Resolutions that never touched a cycle, and so do not depend on the trail.
    cache: HashMap<String, Value>,
    cycles: usize,
}

impl Resolver<'_> {
    fn resolve(&mut self, node: &Value, location: &str) -> Value {
        match node {
            Value::Object(map) => match map.get("$ref") {
                Some(Value::String(reference)) if reference.starts_with('#') => {
                    self.resolve_ref(reference, map, location)
                }
                _ => Value::Object(self.resolve_map(map, location)),
            },
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.resolve(item, &format!("{location}/{index}")))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn resolve_map(&mut self, map: &Map<String, Value>, location: &str) -> Map<String, Value> {
        map.iter()
            .map(|(key, value)| {
                let at = format!("{location}/{}", escape_token(key));
                (key.clone(), self.resolve(value, &at))
            })
            .collect()
    }

    /// A target is circular when it contains the node being walked, or any
    /// node a `$ref` was followed from on the way here.
    fn is_circular(&self, target: &str, location: &str) -> bool {
        let contains = |at: &str| {
            at.strip_prefix(target)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        };
        contains(location) || self.trail.iter().any(|at| contains(at))
    }

    fn resolve_ref(&mut self, reference: &str, node: &Map<String, Value>, location: &str) -> Value {
        let target_location = reference.strip_prefix('#').unwrap_or(reference);
        if self.is_circular(target_location, location) {
            trace!(reference = %reference, location = %location, "leaving circular $ref");
            self.cycles += 1;
            return Value::Object(node.clone());
        }

        let resolved = if let Some(cached) = self.cache.get(reference) {
            cached.clone()
        } else {
            let Some(target) = resolve_pointer(reference, self.root) else {
                trace!(reference = %reference, "leaving unresolvable $ref");
                return Value::Object(node.clone());
            };
            self.trail.push(location.to_string());
            let before = self.cycles;
            let resolved = self.resolve(target, target_location);
            self.trail.pop();
            if self.cycles == before {
                self.cache.insert(reference.to_string(), resolved.clone());
            }
            resolved
        };

        // 3.1 allows siblings next to `$ref`; they override the target.
        if node.len() > 1 {
            if let Value::Object(mut merged) = resolved {
                for (key, value) in node {
                    if key != "$ref" {
                        let at = format!("{location}/{}", escape_token(key));
                        let value = self.resolve(value, &at);
                        merged.insert(key.clone(), value);
                    }
                }
                return Value::Object(merged);
            }
        }
        resolved
    }
}
