//! Lookups against the caller-supplied user context.
//!
//! A user is either a flat map (`{"apiKey": "123"}`) or carries a `keys` list
//! of named credential sets (`{"keys": [{"name": "app-1", "apiKey": "123"}]}`).

use serde_json::Value;

use crate::json_schema::is_truthy;

/// Pick the credential set a lookup should read from.
///
/// With a non-empty `keys` list this is the entry whose `name` equals
/// `selected_app`, or the first entry when no app is selected. Otherwise the
/// user itself.
#[must_use]
pub fn selected_key<'a>(user: &'a Value, selected_app: Option<&str>) -> Option<&'a Value> {
    match user.get("keys").and_then(Value::as_array) {
        Some(keys) if !keys.is_empty() => match selected_app {
            Some(app) => keys.iter().find(|key| name_matches(key.get("name"), app)),
            None => keys.first(),
        },
        _ => Some(user),
    }
}

fn name_matches(name: Option<&Value>, app: &str) -> bool {
    match name {
        Some(Value::String(name)) => name == app,
        Some(Value::Number(name)) => name.to_string() == app,
        _ => false,
    }
}

/// Retrieve `property` for the selected app, or `None` when it is missing or
/// falsy.
///
/// ```
/// use openapi_query::user::get_user_variable;
/// use serde_json::json;
///
/// let user = json!({"keys": [
///     {"name": "app-1", "apiKey": "123"},
///     {"name": "app-2", "apiKey": "789"}
/// ]});
/// assert_eq!(get_user_variable(&user, "apiKey", Some("app-2")), Some(json!("789")));
/// assert_eq!(get_user_variable(&user, "apiKey", None), Some(json!("123")));
/// ```
#[must_use]
pub fn get_user_variable(
    user: &Value,
    property: &str,
    selected_app: Option<&str>,
) -> Option<Value> {
    selected_key(user, selected_app)
        .and_then(|key| key.get(property))
        .filter(|value| is_truthy(value))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_or_null_keys_fall_back_to_the_user() {
        assert_eq!(get_user_variable(&json!({"keys": []}), "apiKey", None), None);
        assert_eq!(get_user_variable(&json!({"keys": null}), "apiKey", None), None);
        assert_eq!(
            get_user_variable(&json!({"keys": [], "apiKey": "top"}), "apiKey", None),
            Some(json!("top"))
        );
    }

    #[test]
    fn reads_top_level_properties() {
        let user = json!({"apiKey": "123456", "user": "user", "pass": "pass"});
        assert_eq!(get_user_variable(&user, "apiKey", None), Some(json!("123456")));
    }

    #[test]
    fn selects_apps_by_name() {
        let user = json!({"keys": [
            {"apiKey": "123456", "name": "app-1"},
            {"apiKey": "7890", "name": 2}
        ]});
        assert_eq!(get_user_variable(&user, "apiKey", None), Some(json!("123456")));
        assert_eq!(get_user_variable(&user, "apiKey", Some("2")), Some(json!("7890")));
        assert_eq!(get_user_variable(&user, "apiKey", Some("app-3")), None);
    }

    #[test]
    fn falsy_values_are_missing() {
        assert_eq!(get_user_variable(&json!({"apiKey": ""}), "apiKey", None), None);
    }
}
