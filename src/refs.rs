//! `$ref` resolution and RFC 6901 JSON pointer helpers.
//!
//! Only local fragment pointers (`#/...`) are understood. External documents
//! are the business of a [`Dereferencer`](crate::dereference::Dereferencer).

use serde_json::Value;
use tracing::debug;

use crate::error::{OasError, Result};

/// Escape a single pointer token (`~` -> `~0`, `/` -> `~1`).
#[must_use]
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape_token`]. `~1` is decoded before `~0` so that `~01`
/// yields `~1` rather than `/`.
#[must_use]
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Split a local `$ref` (`#/a/b~1c`) into decoded tokens.
///
/// Returns `None` when the string is not a local fragment pointer.
#[must_use]
pub fn pointer_tokens(reference: &str) -> Option<Vec<String>> {
    let rest = reference.strip_prefix('#')?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    let rest = rest.strip_prefix('/')?;
    Some(rest.split('/').map(unescape_token).collect())
}

/// Walk `doc` along a local `$ref`, returning the node it names.
#[must_use]
pub fn resolve_pointer<'a>(reference: &str, doc: &'a Value) -> Option<&'a Value> {
    let tokens = pointer_tokens(reference)?;
    let mut current = doc;
    for token in &tokens {
        current = match current {
            Value::Object(map) => map.get(token)?,
            Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Look up the schema a `$ref` points at.
///
/// An empty reference is not an error: it yields `Ok(None)` so callers can use
/// it as a "nothing to resolve" signal. Anything else that cannot be resolved
/// (unrecognized syntax, a missing component, an escaped name that only exists
/// unescaped or vice versa) is [`OasError::ReferenceNotFound`].
///
/// # Example
///
/// ```
/// use openapi_query::refs::find_schema_definition;
/// use serde_json::json;
///
/// let doc = json!({"components": {"schemas": {"Pet/Error": {"type": "object"}}}});
/// let found = find_schema_definition("#/components/schemas/Pet~1Error", &doc).unwrap();
/// assert_eq!(found, Some(json!({"type": "object"})));
/// ```
pub fn find_schema_definition(reference: &str, doc: &Value) -> Result<Option<Value>> {
    if reference.is_empty() {
        return Ok(None);
    }
    match resolve_pointer(reference, doc) {
        Some(found) => Ok(Some(found.clone())),
        None => {
            debug!(reference = %reference, "unresolvable $ref");
            Err(OasError::ReferenceNotFound(reference.to_string()))
        }
    }
}

/// The final token of a `$ref`, i.e. the component name (`#/components/schemas/Pet` -> `Pet`).
#[must_use]
pub fn ref_name(reference: &str) -> Option<String> {
    pointer_tokens(reference).and_then(|mut tokens| tokens.pop())
}

/// `true` when `value` is an object carrying a string `$ref`.
#[must_use]
pub fn is_ref(value: &Value) -> bool {
    value.get("$ref").is_some_and(Value::is_string)
}
