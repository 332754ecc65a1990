//! Credential lookup for the security schemes a definition declares.

use serde_json::{json, Map, Value};

use crate::json_schema::is_truthy;
use crate::user::selected_key;

fn truthy<'a>(key: &'a Value, property: &str) -> Option<&'a Value> {
    key.get(property).filter(|value| is_truthy(value))
}

fn credential_for(key: &Value, scheme_name: &str, scheme: &Value) -> Value {
    let named = truthy(key, scheme_name);
    let token = || {
        named
            .or_else(|| truthy(key, "apiKey"))
            .or_else(|| truthy(scheme, "x-default"))
            .cloned()
            .unwrap_or(Value::Null)
    };

    match scheme.get("type").and_then(Value::as_str) {
        Some("oauth2" | "apiKey") => token(),
        Some("http") => match scheme.get("scheme").and_then(Value::as_str) {
            Some("basic") => named.cloned().unwrap_or_else(|| {
                json!({
                    "user": truthy(key, "user").cloned().unwrap_or(Value::Null),
                    "pass": truthy(key, "pass").cloned().unwrap_or(Value::Null),
                })
            }),
            Some("bearer") => token(),
            _ => Value::Null,
        },
        _ => Value::Null,
    }
}

/// The credential `user` holds for one security scheme.
///
/// `oauth2`, `apiKey` and bearer schemes yield a token (the value stored under
/// the scheme's name, else `apiKey`, else the scheme's `x-default`). Basic
/// auth yields `{user, pass}`. Anything else, or nothing found, is `null`.
#[must_use]
pub fn get_by_scheme(
    user: &Value,
    scheme_name: &str,
    scheme: &Value,
    selected_app: Option<&str>,
) -> Value {
    match selected_key(user, selected_app) {
        Some(key) => credential_for(key, scheme_name, scheme),
        None => Value::Null,
    }
}

/// Credentials for every scheme in `components.securitySchemes`, keyed by
/// scheme name.
///
/// ```
/// use openapi_query::auth::get_auth;
/// use serde_json::json;
///
/// let def = json!({"components": {"securitySchemes": {
///     "petstore_auth": {"type": "oauth2", "flows": {}},
///     "basic": {"type": "http", "scheme": "basic"}
/// }}});
/// let auth = get_auth(&def, &json!({"petstore_auth": "token", "user": "buster"}), None);
/// assert_eq!(auth["petstore_auth"], json!("token"));
/// assert_eq!(auth["basic"], json!({"user": "buster", "pass": null}));
/// ```
#[must_use]
pub fn get_auth(
    definition: &Value,
    user: &Value,
    selected_app: Option<&str>,
) -> Map<String, Value> {
    definition
        .pointer("/components/securitySchemes")
        .and_then(Value::as_object)
        .map(|schemes| {
            schemes
                .iter()
                .map(|(name, scheme)| {
                    (name.clone(), get_by_scheme(user, name, scheme, selected_app))
                })
                .collect()
        })
        .unwrap_or_default()
}
