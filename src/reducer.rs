//! Shrink a definition down to a subset of its operations.
//!
//! Operations are kept by tag, by path (optionally narrowed to methods), or
//! both. Everything the kept operations do not reach is dropped: unused
//! root tags, and components no kept operation references directly or
//! through other components.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{OasError, Result};
use crate::operation::is_method;
use crate::refs::{escape_token, resolve_pointer};

/// Which methods of a path survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFilter {
    /// `*`
    All,
    Methods(Vec<String>),
}

impl PathFilter {
    fn keeps(&self, method: &str) -> bool {
        match self {
            PathFilter::All => true,
            PathFilter::Methods(methods) => methods.iter().any(|m| m.eq_ignore_ascii_case(method)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReduceOptions {
    /// Keep operations carrying at least one of these tags.
    pub tags: Vec<String>,
    /// Keep these paths (compared case-insensitively).
    pub paths: IndexMap<String, PathFilter>,
}

impl ReduceOptions {
    fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.paths.is_empty()
    }
}

/// Every `$ref` string anywhere under `value`.
fn collect_refs(value: &Value, out: &mut IndexSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(reference)) => {
                        out.insert(reference.clone());
                    }
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

fn collect_security(requirements: Option<&Value>, out: &mut IndexSet<String>) {
    let requirements = requirements.and_then(Value::as_array).into_iter().flatten();
    for requirement in requirements.filter_map(Value::as_object) {
        for scheme in requirement.keys() {
            out.insert(format!("#/components/securitySchemes/{}", escape_token(scheme)));
        }
    }
}

fn operation_tags(operation: &Value) -> impl Iterator<Item = &str> {
    operation
        .get("tags")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Follow every reference until nothing new turns up.
fn expand_refs(definition: &Value, refs: &mut IndexSet<String>) {
    let mut next = 0;
    while next < refs.len() {
        let Some(reference) = refs.get_index(next).cloned() else {
            break;
        };
        next += 1;
        if let Some(target) = resolve_pointer(&reference, definition) {
            collect_refs(target, refs);
        }
    }
}

/// A copy of `definition` holding only what `options` selects.
///
/// With empty options the definition comes back unchanged.
///
/// # Errors
///
/// - [`OasError::UnsupportedVersion`] for anything without an `openapi` version
/// - [`OasError::AllPathsRemoved`] when the selection matches no operation
pub fn reduce(definition: &Value, options: &ReduceOptions) -> Result<Value> {
    if options.is_empty() {
        return Ok(definition.clone());
    }
    if definition.get("openapi").and_then(Value::as_str).is_none() {
        return Err(OasError::UnsupportedVersion);
    }

    let mut reduced = definition.clone();
    let mut refs: IndexSet<String> = IndexSet::new();
    let mut used_tags: IndexSet<String> = IndexSet::new();
    collect_security(definition.get("security"), &mut refs);

    let wanted: IndexMap<String, &PathFilter> = options
        .paths
        .iter()
        .map(|(path, filter)| (path.to_lowercase(), filter))
        .collect();

    if let Some(paths) = reduced.get_mut("paths").and_then(Value::as_object_mut) {
        paths.retain(|path, item| {
            let filter = if wanted.is_empty() {
                &PathFilter::All
            } else {
                match wanted.get(&path.to_lowercase()) {
                    Some(filter) => *filter,
                    None => return false,
                }
            };
            let Some(item) = item.as_object_mut() else {
                return false;
            };

            item.retain(|key, operation| {
                if !is_method(key) {
                    return true;
                }
                if !filter.keeps(key) {
                    return false;
                }
                options.tags.is_empty()
                    || operation_tags(operation).any(|tag| options.tags.iter().any(|t| t == tag))
            });

            let mut has_operations = false;
            for (key, operation) in item.iter() {
                if !is_method(key) {
                    continue;
                }
                has_operations = true;
                used_tags.extend(operation_tags(operation).map(str::to_string));
                collect_security(operation.get("security"), &mut refs);
            }
            if has_operations {
                for value in item.values() {
                    collect_refs(value, &mut refs);
                }
            }
            has_operations
        });

        if paths.is_empty() {
            return Err(OasError::AllPathsRemoved);
        }
        debug!(paths = paths.len(), "paths kept");
    }

    if let Some(webhooks) = reduced.get("webhooks") {
        collect_refs(webhooks, &mut refs);
    }
    expand_refs(definition, &mut refs);

    let mut emptied = false;
    if let Some(components) = reduced.get_mut("components").and_then(Value::as_object_mut) {
        for (component_type, entries) in components.iter_mut() {
            if let Some(entries) = entries.as_object_mut() {
                entries.retain(|name, _| {
                    refs.contains(&format!("#/components/{component_type}/{}", escape_token(name)))
                });
            }
        }
        components.retain(|_, entries| {
            entries
                .as_object()
                .is_none_or(|entries| !entries.is_empty())
        });
        emptied = components.is_empty();
    }
    if emptied {
        if let Some(root) = reduced.as_object_mut() {
            root.remove("components");
        }
    }

    let mut no_tags = false;
    if let Some(tags) = reduced.get_mut("tags").and_then(Value::as_array_mut) {
        tags.retain(|tag| {
            tag.get("name")
                .and_then(Value::as_str)
                .is_some_and(|name| used_tags.contains(name))
        });
        no_tags = tags.is_empty();
    }
    if no_tags {
        if let Some(root) = reduced.as_object_mut() {
            root.remove("tags");
        }
    }

    info!(refs = refs.len(), tags = used_tags.len(), "definition reduced");
    Ok(reduced)
}
