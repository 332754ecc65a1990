//! `allOf` flattening.
//!
//! All branches (and any `allOf` nested inside them) are folded into the
//! parent, parent keywords first. Resolution per keyword:
//!
//! | keyword                         | rule                                  |
//! |---------------------------------|---------------------------------------|
//! | `type`                          | intersection, `integer` ⊂ `number`    |
//! | `properties`                    | union, last writer per key            |
//! | `required`, `enum`              | concatenation (`required` unique)     |
//! | `description`                   | last writer                           |
//! | `minimum`, `minLength`, ...     | largest                               |
//! | `maximum`, `maxLength`, ...     | smallest                              |
//! | `items`                         | merged recursively                    |
//! | `readOnly`, `deprecated`, ...   | logical or                            |
//! | anything else                   | first writer                          |

use serde_json::{Map, Value};

/// Why an `allOf` could not be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergeConflict(pub String);

const LOWER_BOUNDS: &[&str] = &[
    "minimum",
    "exclusiveMinimum",
    "minLength",
    "minItems",
    "minProperties",
    "minContains",
];

const UPPER_BOUNDS: &[&str] = &[
    "maximum",
    "exclusiveMaximum",
    "maxLength",
    "maxItems",
    "maxProperties",
    "maxContains",
];

const ANY_TRUE: &[&str] = &["uniqueItems", "readOnly", "writeOnly", "deprecated"];

/// Merge `schema.allOf` into `schema`, removing the keyword.
pub(crate) fn merge_all_of(
    schema: &Map<String, Value>,
) -> Result<Map<String, Value>, MergeConflict> {
    let mut base = schema.clone();
    let branches = base.remove("allOf");
    let mut parts = vec![base];
    if let Some(Value::Array(branches)) = branches {
        flatten(&branches, &mut parts)?;
    }
    merge_parts(parts)
}

fn flatten(branches: &[Value], out: &mut Vec<Map<String, Value>>) -> Result<(), MergeConflict> {
    for branch in branches {
        match branch {
            Value::Object(map) => {
                let mut own = map.clone();
                let nested = own.remove("allOf");
                out.push(own);
                if let Some(Value::Array(nested)) = nested {
                    flatten(&nested, out)?;
                }
            }
            Value::Bool(false) => {
                return Err(MergeConflict("`false` schema inside allOf".into()));
            }
            _ => {}
        }
    }
    Ok(())
}

fn merge_parts(parts: Vec<Map<String, Value>>) -> Result<Map<String, Value>, MergeConflict> {
    let mut merged = Map::new();
    for part in parts {
        for (key, value) in part {
            let resolved = match merged.remove(&key) {
                None => value,
                Some(existing) => resolve(&key, existing, value)?,
            };
            merged.insert(key, resolved);
        }
    }
    Ok(merged)
}

fn resolve(key: &str, existing: Value, incoming: Value) -> Result<Value, MergeConflict> {
    let value = match key {
        "type" => intersect_types(&existing, &incoming)?,
        "properties" => match (existing, incoming) {
            (Value::Object(mut left), Value::Object(right)) => {
                left.extend(right);
                Value::Object(left)
            }
            (left, _) => left,
        },
        "required" => match (existing, incoming) {
            (Value::Array(mut left), Value::Array(right)) => {
                for name in right {
                    if !left.contains(&name) {
                        left.push(name);
                    }
                }
                Value::Array(left)
            }
            (left, _) => left,
        },
        "enum" => match (existing, incoming) {
            (Value::Array(mut left), Value::Array(right)) => {
                left.extend(right);
                Value::Array(left)
            }
            (left, _) => left,
        },
        "description" => incoming,
        "items" => match (existing, incoming) {
            (Value::Object(left), Value::Object(right)) => {
                Value::Object(merge_parts(vec![left, right])?)
            }
            (left, _) => left,
        },
        k if LOWER_BOUNDS.contains(&k) => pick_number(existing, incoming, f64::max),
        k if UPPER_BOUNDS.contains(&k) => pick_number(existing, incoming, f64::min),
        k if ANY_TRUE.contains(&k) => {
            Value::Bool(existing.as_bool().unwrap_or(false) || incoming.as_bool().unwrap_or(false))
        }
        _ => existing,
    };
    Ok(value)
}

fn pick_number(existing: Value, incoming: Value, pick: fn(f64, f64) -> f64) -> Value {
    match (existing.as_f64(), incoming.as_f64()) {
        (Some(left), Some(right)) => {
            if pick(left, right) == left {
                existing
            } else {
                incoming
            }
        }
        (None, Some(_)) => incoming,
        _ => existing,
    }
}

fn type_names(value: &Value) -> Vec<&str> {
    match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn intersect_types(left: &Value, right: &Value) -> Result<Value, MergeConflict> {
    let left_names = type_names(left);
    let right_names = type_names(right);
    let mut common: Vec<&str> = Vec::new();
    for name in &left_names {
        let hit = if right_names.contains(name) {
            Some(*name)
        } else if (*name == "number" && right_names.contains(&"integer"))
            || (*name == "integer" && right_names.contains(&"number"))
        {
            Some("integer")
        } else {
            None
        };
        if let Some(hit) = hit {
            if !common.contains(&hit) {
                common.push(hit);
            }
        }
    }

    match common.as_slice() {
        [] => Err(MergeConflict(format!(
            "incompatible types {left} and {right}"
        ))),
        [only] => Ok(Value::String((*only).to_string())),
        many => Ok(Value::Array(
            many.iter().map(|name| Value::String((*name).to_string())).collect(),
        )),
    }
}
