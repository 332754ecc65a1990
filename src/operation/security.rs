//! Security requirements and the scheme types behind them.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use super::Operation;

/// How a security scheme is presented to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SecurityType {
    Basic,
    Bearer,
    Query,
    Header,
    Cookie,
    OAuth2,
    OpenIdConnect,
    /// `http` with a scheme other than basic or bearer.
    #[serde(rename = "http")]
    Http,
    /// `apiKey` with an unrecognized `in`.
    #[serde(rename = "apiKey")]
    ApiKey,
}

impl SecurityType {
    /// Classify a Security Scheme Object; `None` for unknown types.
    #[must_use]
    pub fn classify(scheme: &Value) -> Option<Self> {
        let field = |key: &str| scheme.get(key).and_then(Value::as_str);
        match field("type")? {
            "http" => Some(match field("scheme") {
                Some("basic") => SecurityType::Basic,
                Some("bearer") => SecurityType::Bearer,
                _ => SecurityType::Http,
            }),
            "apiKey" => Some(match field("in") {
                Some("query") => SecurityType::Query,
                Some("header") => SecurityType::Header,
                Some("cookie") => SecurityType::Cookie,
                _ => SecurityType::ApiKey,
            }),
            "oauth2" => Some(SecurityType::OAuth2),
            "openIdConnect" => Some(SecurityType::OpenIdConnect),
            _ => None,
        }
    }
}

/// A Security Scheme Object with the name it is registered under.
///
/// The name is only added to this copy; the definition is never touched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyedScheme {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(flatten)]
    pub scheme: Map<String, Value>,
}

/// One entry of a security requirement, classified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityWithType {
    #[serde(rename = "type")]
    pub kind: SecurityType,
    pub security: KeyedScheme,
}

impl Operation {
    /// Security requirements in effect: the operation's own, else the
    /// definition's. Empty when the definition declares no security schemes.
    #[must_use]
    pub fn security(&self) -> Vec<Map<String, Value>> {
        let has_schemes = self
            .definition
            .pointer("/components/securitySchemes")
            .and_then(Value::as_object)
            .is_some_and(|schemes| !schemes.is_empty());
        if !has_schemes {
            return Vec::new();
        }
        self.schema
            .get("security")
            .or_else(|| self.definition.get("security"))
            .and_then(Value::as_array)
            .map(|requirements| requirements.iter().filter_map(Value::as_object).cloned().collect())
            .unwrap_or_default()
    }

    /// Every requirement group with each scheme classified.
    ///
    /// An unknown scheme (or one of an unknown type) is `None`, or dropped
    /// entirely when `filter_invalid` is set.
    #[must_use]
    pub fn security_with_types(&self, filter_invalid: bool) -> Vec<Vec<Option<SecurityWithType>>> {
        let schemes = self
            .definition
            .pointer("/components/securitySchemes")
            .and_then(Value::as_object);

        self.security()
            .iter()
            .map(|requirement| {
                let classified = requirement.keys().map(|key| {
                    let scheme = schemes?.get(key)?;
                    let kind = SecurityType::classify(scheme)?;
                    Some(SecurityWithType {
                        kind,
                        security: KeyedScheme {
                            key: key.clone(),
                            scheme: scheme.as_object().cloned().unwrap_or_default(),
                        },
                    })
                });
                if filter_invalid {
                    classified.filter(Option::is_some).collect()
                } else {
                    classified.collect()
                }
            })
            .collect()
    }

    /// Schemes in use grouped by type, each scheme listed once even when it
    /// appears in several requirement groups.
    #[must_use]
    pub fn prepare_security(&self) -> IndexMap<SecurityType, Vec<KeyedScheme>> {
        let mut grouped: IndexMap<SecurityType, Vec<KeyedScheme>> = IndexMap::new();
        for entry in self.security_with_types(false).into_iter().flatten().flatten() {
            let schemes = grouped.entry(entry.kind).or_default();
            if !schemes.iter().any(|known| known.key == entry.security.key) {
                schemes.push(entry.security);
            }
        }
        grouped
    }
}
