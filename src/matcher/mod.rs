//! # Matcher Module
//!
//! Resolves a concrete request URL (and optionally a method) to the path
//! template that declares it.
//!
//! ## Algorithm
//!
//! 1. Pick the server the URL belongs to. Servers are compared after
//!    variable substitution, case-insensitively on the origin and then the
//!    hostname. If neither hits, each server template is turned into a regex
//!    with every variable as a wildcard, so `https://{region}.node.example.com`
//!    still matches `https://eu.node.example.com` whatever the user's region.
//! 2. Strip the server prefix to get the candidate path (`""` becomes `/`).
//! 3. Try every path template against it (see [`PathTemplate`]); templates
//!    that do not compile are skipped.
//! 4. Optionally keep only paths declaring the method, then prefer the match
//!    with the fewest parameters. Ties go to the first path declared.
//!
//! A definition without servers is treated as if its server were the
//! request's own origin.

mod path;
mod server;

use http::Method;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::{Position, Url};

pub use path::{PathTemplate, Slugs, MAX_INLINE_SLUGS};
pub use server::{
    default_variables, ensure_protocol, normalized_url, replace_url, server_variables,
    split_url, split_variables, strip_trailing_slash, ServerSelection, UrlChunk,
    DEFAULT_SERVER_URL,
};

/// Where a URL landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRoute {
    /// Server prefix as declared (after variable substitution where possible).
    pub origin: String,
    /// Template with `{name}` rewritten to `:name`.
    pub path: String,
    /// Template exactly as written in the definition.
    pub non_normalized_path: String,
    #[serde(serialize_with = "serialize_slugs")]
    pub slugs: Slugs,
    /// Upper-cased; `None` for method-less lookups.
    #[serde(serialize_with = "serialize_method", skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
}

impl MatchedRoute {
    /// Captured value for `name` (with or without the leading `:`).
    #[must_use]
    pub fn slug(&self, name: &str) -> Option<&str> {
        let wanted = name.strip_prefix(':').unwrap_or(name);
        self.slugs
            .iter()
            .find(|(key, _)| key.strip_prefix(':') == Some(wanted))
            .map(|(_, value)| value.as_str())
    }

    /// Slugs as a JSON object, `{":petId": "1"}`.
    #[must_use]
    pub fn slugs_map(&self) -> Map<String, Value> {
        self.slugs
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect()
    }
}

fn serialize_slugs<S: Serializer>(slugs: &Slugs, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(slugs.iter().map(|(k, v)| (k, v)))
}

fn serialize_method<S: Serializer>(
    method: &Option<Method>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match method {
        Some(method) => serializer.serialize_str(method.as_str()),
        None => serializer.serialize_none(),
    }
}

/// A path template matching a URL, before method filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatch {
    pub url: MatchedRoute,
    /// The whole Path Item object.
    pub path_item: Value,
}

/// A path template and method matching a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationMatch {
    pub url: MatchedRoute,
    /// The Operation object under the matched method.
    pub operation: Value,
}

struct TargetServer {
    url: String,
    path_name: String,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}

/// Remainder of `url` after the first case-insensitive occurrence of `prefix`.
fn after_prefix<'a>(url: &'a str, prefix: &str) -> Option<&'a str> {
    let start = url.to_ascii_lowercase().find(&prefix.to_ascii_lowercase())?;
    Some(&url[start + prefix.len()..])
}

fn locate_server(definition: &Value, user: &Value, url: &str) -> Option<TargetServer> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin().ascii_serialization();
    let hostname = parsed.host_str().unwrap_or_default();

    let servers = match definition.get("servers").and_then(Value::as_array) {
        Some(servers) if !servers.is_empty() => servers,
        _ => {
            trace!(origin = %origin, "no servers declared, using request origin");
            return Some(TargetServer {
                path_name: parsed[Position::BeforePath..].to_string(),
                url: origin,
            });
        }
    };

    let substituted: Vec<(&Value, String)> = servers
        .iter()
        .filter_map(|server| {
            let template = server.get("url").and_then(Value::as_str)?;
            let variables = server.get("variables").cloned().unwrap_or(Value::Null);
            Some((server, replace_url(template, &variables, user)))
        })
        .collect();

    let direct = substituted
        .iter()
        .find(|(_, replaced)| contains_ignore_case(replaced, &origin))
        .or_else(|| {
            substituted.iter().find(|(_, replaced)| {
                !hostname.is_empty() && contains_ignore_case(replaced, hostname)
            })
        });

    if let Some((_, replaced)) = direct {
        let path_name = after_prefix(url, replaced)?;
        return Some(TargetServer {
            url: replaced.clone(),
            path_name: path_name.to_string(),
        });
    }

    // Loosen every variable into a wildcard and try again.
    servers.iter().find_map(|server| {
        let template = server.get("url").and_then(Value::as_str)?;
        let found = server::server_regex(template)?.find(url)?;
        debug!(server = %template, "matched server by variable wildcard");
        Some(TargetServer {
            url: template.to_string(),
            path_name: url[found.end()..].to_string(),
        })
    })
}

/// Every path template that structurally matches `url`, in declaration order.
///
/// `None` when no server applies, no path can be extracted, or nothing matches.
#[must_use]
pub fn find_operation_matches(
    definition: &Value,
    user: &Value,
    url: &str,
) -> Option<Vec<PathMatch>> {
    let target = locate_server(definition, user, url)?;
    let path_name = if target.path_name.is_empty() {
        "/"
    } else {
        target.path_name.as_str()
    };
    let pruned = path_name.split('?').next().unwrap_or_default();
    let origin = strip_trailing_slash(&target.url).to_string();

    let paths = definition.get("paths").and_then(Value::as_object)?;
    let matches: Vec<PathMatch> = paths
        .iter()
        .filter_map(|(template, path_item)| {
            let Some(compiled) = PathTemplate::compile(template) else {
                trace!(template = %template, "skipping uncompilable path template");
                return None;
            };
            let slugs = compiled.captures(pruned)?;
            Some(PathMatch {
                url: MatchedRoute {
                    origin: origin.clone(),
                    path: compiled.normalized().to_string(),
                    non_normalized_path: template.clone(),
                    slugs,
                    method: None,
                },
                path_item: path_item.clone(),
            })
        })
        .collect();

    if matches.is_empty() {
        debug!(url = %url, path = %pruned, "no path templates matched");
        None
    } else {
        Some(matches)
    }
}

fn fewest_slugs<T>(candidates: Vec<T>, route: impl Fn(&T) -> &MatchedRoute) -> Option<T> {
    let mut best: Option<T> = None;
    for candidate in candidates {
        let better = best
            .as_ref()
            .is_none_or(|current| route(&candidate).slugs.len() < route(current).slugs.len());
        if better {
            best = Some(candidate);
        }
    }
    best
}

/// Resolve `url` + `method` to a single operation.
///
/// ```
/// use openapi_query::matcher::find_operation;
/// use serde_json::json;
///
/// let def = json!({
///     "servers": [{"url": "http://petstore.swagger.io/v2"}],
///     "paths": {
///         "/pet/findByStatus": {"get": {"operationId": "findPetsByStatus"}},
///         "/pet/{petId}": {"get": {"operationId": "getPetById"}}
///     }
/// });
/// let url = "http://petstore.swagger.io/v2/pet/findByStatus";
/// let found = find_operation(&def, &json!({}), url, "get").unwrap();
/// assert_eq!(found.operation["operationId"], "findPetsByStatus");
/// assert_eq!(found.url.method.unwrap().as_str(), "GET");
/// ```
#[must_use]
pub fn find_operation(
    definition: &Value,
    user: &Value,
    url: &str,
    method: &str,
) -> Option<OperationMatch> {
    let upper = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).ok()?;
    let candidates: Vec<OperationMatch> = find_operation_matches(definition, user, url)?
        .into_iter()
        .filter_map(|found| {
            let item = found.path_item.as_object()?;
            let operation = item
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(method))
                .map(|(_, operation)| operation.clone())?;
            Some(OperationMatch {
                url: MatchedRoute {
                    method: Some(upper.clone()),
                    ..found.url
                },
                operation,
            })
        })
        .collect();

    let found = fewest_slugs(candidates, |m| &m.url);
    if let Some(found) = &found {
        debug!(
            url = %url,
            method = %upper,
            path = %found.url.non_normalized_path,
            "matched operation"
        );
    }
    found
}

/// The best structural match for `url`, regardless of method.
#[must_use]
pub fn find_operation_without_method(
    definition: &Value,
    user: &Value,
    url: &str,
) -> Option<PathMatch> {
    fewest_slugs(find_operation_matches(definition, user, url)?, |m| &m.url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn petstore() -> Value {
        json!({
            "openapi": "3.0.0",
            "servers": [{"url": "http://petstore.swagger.io/v2"}],
            "paths": {
                "/pet/{petId}": {
                    "get": {"operationId": "getPetById"},
                    "delete": {"operationId": "deletePet"}
                },
                "/pet/findByStatus": {"get": {"operationId": "findPetsByStatus"}}
            }
        })
    }

    #[test]
    fn literal_beats_template() {
        let url = "http://petstore.swagger.io/v2/pet/findByStatus?x=1";
        let found = find_operation(&petstore(), &json!({}), url, "get").unwrap();
        assert_eq!(found.url.path, "/pet/findByStatus");
        assert!(found.url.slugs.is_empty());
    }

    #[test]
    fn ties_go_to_the_first_declared_path() {
        let def = json!({
            "paths": {
                "/a/{x}": {"get": {"operationId": "first"}},
                "/{y}/b": {"get": {"operationId": "second"}}
            }
        });
        let found = find_operation(&def, &json!({}), "https://example.com/a/b", "get").unwrap();
        assert_eq!(found.operation["operationId"], "first");
    }

    #[test]
    fn method_is_matched_case_insensitively() {
        let url = "http://petstore.swagger.io/v2/pet/1";
        let found = find_operation(&petstore(), &json!({}), url, "DELETE").unwrap();
        assert_eq!(found.url.method, Some(Method::DELETE));
        assert_eq!(found.url.slug("petId"), Some("1"));
        assert!(find_operation(&petstore(), &json!({}), url, "patch").is_none());
    }

    #[test]
    fn method_less_lookup() {
        let url = "http://petstore.swagger.io/v2/pet/1";
        let found = find_operation_without_method(&petstore(), &json!({}), url).unwrap();
        assert_eq!(found.url.non_normalized_path, "/pet/{petId}");
        assert!(found.url.method.is_none());
        assert!(found.path_item.get("delete").is_some());
    }

    #[test]
    fn routes_serialize_like_plain_data() {
        let url = "http://petstore.swagger.io/v2/pet/1";
        let found = find_operation(&petstore(), &json!({}), url, "delete").unwrap();
        assert_eq!(
            serde_json::to_value(&found.url).unwrap(),
            json!({
                "origin": "http://petstore.swagger.io/v2",
                "path": "/pet/:petId",
                "nonNormalizedPath": "/pet/{petId}",
                "slugs": {":petId": "1"},
                "method": "DELETE"
            })
        );
    }
}
