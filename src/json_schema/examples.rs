//! Reshaping OpenAPI `example`/`examples` into JSON Schema `examples` arrays,
//! and recovering examples for nested properties from an ancestor's example.

use serde_json::{Map, Value};

/// String, number or boolean. `null` is not a primitive here.
#[must_use]
pub fn is_primitive(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// JavaScript-style truthiness.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn primitive_or_primitive_list(value: &Value) -> bool {
    is_primitive(value)
        || matches!(value, Value::Array(items) if items.first().is_some_and(is_primitive))
}

/// Collapse `example`/`examples` on `schema` in place.
///
/// Non-primitive examples that cannot be expressed directly are appended to
/// `ancestors` so descendants can pick values out of them.
pub(crate) fn reshape_examples(schema: &mut Map<String, Value>, ancestors: &mut Vec<Value>) {
    if let Some(example) = schema.remove("example") {
        if is_primitive(&example) {
            schema.insert("examples".into(), Value::Array(vec![example]));
        } else if let Value::Array(items) = example {
            let primitives: Vec<Value> = items.into_iter().filter(is_primitive).collect();
            if primitives.is_empty() {
                schema.remove("examples");
            } else {
                schema.insert("examples".into(), Value::Array(primitives));
            }
        } else {
            ancestors.push(example);
        }
        return;
    }

    let Some(examples) = schema.get("examples").cloned() else {
        return;
    };

    let keep = match &examples {
        Value::Object(named) => {
            let mut found = Vec::new();
            for example in named.values() {
                if crate::refs::is_ref(example) {
                    continue;
                }
                let Some(value) = example.get("value") else {
                    continue;
                };
                if is_primitive(value) {
                    found.push(value.clone());
                } else if let Some(first) = value
                    .as_array()
                    .and_then(|items| items.first())
                    .filter(|first| is_primitive(first))
                {
                    found.push(first.clone());
                } else {
                    ancestors.push(value.clone());
                }
            }
            if found.is_empty() {
                false
            } else {
                schema.insert("examples".into(), Value::Array(found));
                true
            }
        }
        Value::Array(items) => items.first().is_some_and(is_primitive),
        _ => false,
    };

    if !keep {
        schema.remove("examples");
    }
}

/// Search `ancestors` (newest first) for a value at some suffix of `location`.
///
/// Suffixes are tried shortest first: for `/tags/id` the pointer `/id` is
/// tried against every ancestor before `/tags/id` is. This means a shallow
/// match in an unrelated ancestor wins over the exact path, which is why a
/// nested `tags.id` can inherit the root example's `id`.
#[must_use]
pub fn search_for_value_by_pointer(location: &str, ancestors: &[Value]) -> Option<Value> {
    if ancestors.is_empty() || location.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = location.split('/').filter(|t| !t.is_empty()).collect();
    let mut pointers = Vec::with_capacity(tokens.len());
    let mut pointer = String::new();
    for token in tokens.iter().rev() {
        pointer = format!("/{token}{pointer}");
        pointers.push(pointer.clone());
    }

    pointers.iter().find_map(|pointer| {
        ancestors
            .iter()
            .rev()
            .find_map(|ancestor| ancestor.pointer(pointer).cloned())
    })
}

/// Fill `examples` from an ancestor when the node is primitive and has none.
pub(crate) fn inherit_example(
    schema: &mut Map<String, Value>,
    location: &str,
    ancestors: &[Value],
) {
    if let Some(found) = search_for_value_by_pointer(location, ancestors) {
        if is_truthy(&found) && primitive_or_primitive_list(&found) {
            schema.insert("examples".into(), Value::Array(vec![found]));
        }
    }
}

/// What a caller-supplied seed (a media type's `example`/`examples`) contributes
/// to the ancestor list.
#[must_use]
pub fn seed_from_media_type(media_type: &Value) -> Option<Value> {
    if let Some(example) = media_type.get("example") {
        return Some(example.clone());
    }
    // A named `examples` map contributes the value of its first entry.
    media_type
        .get("examples")
        .and_then(Value::as_object)
        .and_then(|named| named.values().find_map(|example| example.get("value")))
        .filter(|value| is_truthy(value))
        .cloned()
}
