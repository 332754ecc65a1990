//! Server URL templating.
//!
//! Server URLs carry `{name}` placeholders that are filled from the user
//! context, then from the server's declared variables. The helpers here are
//! pure; [`Oas`](crate::Oas) wires them to a definition and user.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::user::get_user_variable;

/// Fallback base URL when a definition declares no usable server.
pub const DEFAULT_SERVER_URL: &str = "https://example.com";

#[allow(clippy::expect_used)]
static SERVER_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([-_a-zA-Z0-9\[\]]+)\}").expect("server variable regex should be valid")
});

#[allow(clippy::expect_used)]
static URL_CHUNK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{.+?\}").expect("url chunk regex should be valid")
});

/// What a server variable may expand to when it is unknown.
const VARIABLE_WILDCARD: &str = r"([-_a-zA-Z0-9:.\[\]]+)";

/// Drop one trailing `/`.
#[must_use]
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Give schemeless (`//host`) and bare (`host/path`) URLs an `https` scheme.
#[must_use]
pub fn ensure_protocol(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else if !url.contains("//") {
        format!("https://{url}")
    } else {
        url.to_string()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Substitute `{name}` placeholders in `url`.
///
/// Each placeholder takes the user's value for `name` if there is one, else
/// `variables[name]` (either a `{default}` object or a plain value). Unknown
/// placeholders are left as written. One trailing slash is stripped.
#[must_use]
pub fn replace_url(url: &str, variables: &Value, user: &Value) -> String {
    let replaced = SERVER_VARIABLE.replace_all(url, |caps: &Captures<'_>| {
        let original = caps[0].to_string();
        let key = &caps[1];
        if let Some(found) = get_user_variable(user, key, None).as_ref().and_then(scalar_text) {
            return found;
        }
        match variables.get(key) {
            Some(Value::Object(variable)) => variable
                .get("default")
                .and_then(scalar_text)
                .unwrap_or(original),
            Some(Value::Array(_)) | Some(Value::Null) | None => original,
            Some(plain) => scalar_text(plain).unwrap_or(original),
        }
    });
    strip_trailing_slash(&replaced).to_string()
}

/// The raw URL of `servers[selected]`, normalized for display.
///
/// Relative URLs are resolved against [`DEFAULT_SERVER_URL`]; a missing
/// server or empty URL falls back to it entirely.
#[must_use]
pub fn normalized_url(definition: &Value, selected: usize) -> String {
    let declared = definition
        .get("servers")
        .and_then(|servers| servers.get(selected))
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty());

    let url = match declared {
        Some(url) => {
            let url = strip_trailing_slash(url);
            if url.starts_with('/') && !url.starts_with("//") {
                format!("{DEFAULT_SERVER_URL}{url}")
            } else {
                url.to_string()
            }
        }
        None => DEFAULT_SERVER_URL.to_string(),
    };
    ensure_protocol(&url)
}

/// `servers[selected].variables`, or an empty map.
#[must_use]
pub fn server_variables(definition: &Value, selected: usize) -> Map<String, Value> {
    definition
        .get("servers")
        .and_then(|servers| servers.get(selected))
        .and_then(|server| server.get("variables"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Each variable's effective value: the user's, else the declared default.
#[must_use]
pub fn default_variables(definition: &Value, user: &Value, selected: usize) -> Map<String, Value> {
    server_variables(definition, selected)
        .into_iter()
        .map(|(key, variable)| {
            let value = get_user_variable(user, &key, None)
                .or_else(|| variable.get("default").cloned())
                .unwrap_or(Value::Null);
            (key, value)
        })
        .collect()
}

/// One piece of a split server URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UrlChunk {
    Text {
        key: String,
        value: String,
    },
    Variable {
        key: String,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
        enum_values: Option<Vec<Value>>,
    },
}

impl UrlChunk {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Text { key, .. } | Self::Variable { key, .. } => key,
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Text { value, .. } | Self::Variable { value, .. } => value,
        }
    }
}

/// Split `servers[selected]` into text and variable chunks for rendering.
///
/// Keys are `<value>-<index>` so repeated variables stay distinct.
#[must_use]
pub fn split_url(definition: &Value, selected: usize) -> Vec<UrlChunk> {
    let url = normalized_url(definition, selected);
    let variables = server_variables(definition, selected);

    let mut parts: Vec<(&str, bool)> = Vec::new();
    let mut last = 0;
    for found in URL_CHUNK.find_iter(&url) {
        if found.start() > last {
            parts.push((&url[last..found.start()], false));
        }
        parts.push((found.as_str(), true));
        last = found.end();
    }
    if last < url.len() {
        parts.push((&url[last..], false));
    }

    parts
        .into_iter()
        .enumerate()
        .map(|(index, (part, is_variable))| {
            let value: String = part.chars().filter(|c| *c != '{' && *c != '}').collect();
            let key = format!("{value}-{index}");
            if !is_variable {
                return UrlChunk::Text { key, value };
            }
            let variable = variables.get(&value);
            UrlChunk::Variable {
                description: variable
                    .and_then(|v| v.get("description"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                enum_values: variable
                    .and_then(|v| v.get("enum"))
                    .and_then(Value::as_array)
                    .cloned(),
                key,
                value,
            }
        })
        .collect()
}

/// A server picked out by [`split_variables`] and the values its variables took.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerSelection {
    pub selected: usize,
    pub variables: Map<String, Value>,
}

/// Build an unanchored regex for a server template, each variable becoming a
/// capture group.
pub(crate) fn server_regex(template: &str) -> Option<Regex> {
    let stripped = strip_trailing_slash(template);
    let mut pattern = String::with_capacity(stripped.len() + 32);
    let mut last = 0;
    for found in SERVER_VARIABLE.find_iter(stripped) {
        pattern.push_str(&regex::escape(&stripped[last..found.start()]));
        pattern.push_str(VARIABLE_WILDCARD);
        last = found.end();
    }
    pattern.push_str(&regex::escape(&stripped[last..]));
    Regex::new(&pattern).ok()
}

/// Find the first server whose template matches `base_url` and recover the
/// variable values that produce it.
///
/// ```
/// use openapi_query::matcher::split_variables;
/// use serde_json::json;
///
/// let def = json!({"servers": [{"url": "https://{name}.example.com:{port}/{basePath}"}]});
/// let found = split_variables(&def, "https://buster.example.com:3000/pet").unwrap();
/// assert_eq!(found.selected, 0);
/// assert_eq!(found.variables["port"], json!("3000"));
/// ```
#[must_use]
pub fn split_variables(definition: &Value, base_url: &str) -> Option<ServerSelection> {
    let servers = definition.get("servers").and_then(Value::as_array)?;
    servers.iter().enumerate().find_map(|(selected, server)| {
        let template = server.get("url").and_then(Value::as_str)?;
        let caps = server_regex(template)?.captures(base_url)?;
        let mut variables = Map::new();
        for (index, name) in SERVER_VARIABLE.captures_iter(template).enumerate() {
            let value = caps.get(index + 1).map_or("", |m| m.as_str());
            variables.insert(name[1].to_string(), Value::String(value.to_string()));
        }
        Some(ServerSelection { selected, variables })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEMPLATE: &str = "https://{name}.example.com:{port}/{basePath}";

    #[test]
    fn protocol_is_ensured() {
        assert_eq!(ensure_protocol("//example.com"), "https://example.com");
        assert_eq!(ensure_protocol("example.com/v1"), "https://example.com/v1");
        assert_eq!(ensure_protocol("http://example.com"), "http://example.com");
    }

    #[test]
    fn replace_prefers_user_values() {
        let user = json!({"name": "mysubdomain", "port": "8000", "basePath": "v5"});
        assert_eq!(
            replace_url(TEMPLATE, &Value::Null, &user),
            "https://mysubdomain.example.com:8000/v5"
        );
        assert_eq!(replace_url(TEMPLATE, &Value::Null, &json!({})), TEMPLATE);
    }

    #[test]
    fn replace_accepts_defaults_or_plain_values() {
        let defaults = json!({
            "name": {"default": "demo"},
            "port": {"default": "443"},
            "basePath": {"default": "v2"}
        });
        assert_eq!(
            replace_url(TEMPLATE, &defaults, &json!({})),
            "https://demo.example.com:443/v2"
        );
        let plain = json!({"name": "subdomain", "port": 8080, "basePath": "v3"});
        assert_eq!(
            replace_url(TEMPLATE, &plain, &json!({})),
            "https://subdomain.example.com:8080/v3"
        );
    }

    #[test]
    fn replace_tolerates_odd_shapes() {
        let odd = json!({"name": {}, "port": "443", "basePath": [{"default": "v2"}]});
        assert_eq!(
            replace_url(TEMPLATE, &odd, &json!({})),
            "https://{name}.example.com:443/{basePath}"
        );
    }

    #[test]
    fn normalized_url_fallbacks() {
        assert_eq!(normalized_url(&json!({}), 0), DEFAULT_SERVER_URL);
        assert_eq!(
            normalized_url(&json!({"servers": [{"url": "/api/v3"}]}), 0),
            "https://example.com/api/v3"
        );
        assert_eq!(normalized_url(&json!({"servers": [{"url": ""}]}), 0), DEFAULT_SERVER_URL);
    }

    #[test]
    fn split_url_keys_are_unique() {
        let def = json!({"servers": [{"url": "https://example.com/{test}/{test}"}]});
        let chunks = split_url(&def, 0);
        let keys: Vec<&str> = chunks.iter().map(UrlChunk::key).collect();
        assert_eq!(keys, vec!["https://example.com/-0", "test-1", "/-2", "test-3"]);

        let def = json!({"servers": [{
            "url": concat!(
                "https://example.com/v1/flight/{FlightID}",
                "/sitezonetargeting/{SiteZoneTargetingID}"
            )
        }]});
        assert_eq!(split_url(&def, 0).len(), 4);
    }

    #[test]
    fn split_url_carries_variable_metadata() {
        let def = json!({"servers": [{
            "url": "https://example.com/{path}",
            "variables": {"path": {
                "default": "v1",
                "enum": ["v1", "v2"],
                "description": "path description"
            }}
        }]});
        match &split_url(&def, 0)[1] {
            UrlChunk::Variable { description, enum_values, .. } => {
                assert_eq!(description.as_deref(), Some("path description"));
                assert_eq!(enum_values.clone(), Some(vec![json!("v1"), json!("v2")]));
            }
            other => panic!("expected a variable, got {other:?}"),
        }
    }

    #[test]
    fn split_variables_handles_duplicates() {
        let def = json!({"servers": [
            {"url": "http://{region}.api.example.com/region/{region}/{lang}"}
        ]});
        let found = split_variables(&def, "http://eu.api.example.com/region/eu/fr-CH").unwrap();
        assert_eq!(
            Value::Object(found.variables),
            json!({"region": "eu", "lang": "fr-CH"})
        );
        assert!(split_variables(&json!({}), "https://local.dev").is_none());
    }

    #[test]
    fn default_variables_embellish_with_user() {
        let def = json!({"servers": [{
            "url": "https://example.com/{path}",
            "variables": {"path": {"default": "default-path"}, "port": {"default": "8000"}}
        }]});
        let defaults = default_variables(&def, &json!({"path": "user-path"}), 0);
        assert_eq!(Value::Object(defaults), json!({"path": "user-path", "port": "8000"}));
        assert!(server_variables(&def, 10).is_empty());
    }
}
