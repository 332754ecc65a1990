//! # Operation Module
//!
//! A read-only view over one Operation Object.
//!
//! An [`Operation`] is rebuilt on every lookup from the owning definition and
//! never writes back to it. Asking for a path or method the definition does
//! not declare still yields a usable operation whose schema is
//! `{"parameters": []}`, so callers can treat "missing" like "empty".
//!
//! ## Accessor families
//!
//! - identity: [`Operation::summary`], [`Operation::operation_id`], [`Operation::tags`]
//! - payloads: [`Operation::content_type`], [`Operation::request_body`], responses
//! - security: see `security.rs` ([`Operation::security_with_types`],
//!   [`Operation::prepare_security`])
//! - JSON Schema: [`Operation::parameters_as_json_schema`],
//!   [`Operation::response_as_json_schema`]
//! - examples: [`Operation::request_body_examples`], [`Operation::response_examples`],
//!   [`Operation::callback_examples`]
//!
//! Callbacks are operations too. Their "path" is the runtime expression
//! (`{$request.body#/callbackUrl}`) and their path item is the callback's
//! expression object, so common parameters and summaries resolve the same
//! way they do for ordinary paths.

mod examples;
mod parameters;
mod response;
mod security;

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::json_schema::{is_truthy, RepairMode};
use crate::mime;
use crate::refs::{is_ref, resolve_pointer};
use crate::samples::ExampleCache;

pub use examples::{CallbackExample, MediaTypeExample, RequestBodyExample, ResponseExample};
pub use parameters::{DeprecatedProps, ParameterGroup, ParameterSchema, ParameterSchemaOptions};
pub use response::{ResponseSchema, ResponseSchemaOptions};
pub use security::{KeyedScheme, SecurityType, SecurityWithType};

/// HTTP methods an Operation Object may live under.
pub const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// `true` when `key` in a Path Item names an operation.
#[must_use]
pub fn is_method(key: &str) -> bool {
    METHODS.contains(&key)
}

#[allow(clippy::expect_used)]
static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Z0-9_]").expect("non alphanumeric regex should be valid")
});
#[allow(clippy::expect_used)]
static REPEATED_DASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"--+").expect("repeated dash regex should be valid")
});
#[allow(clippy::expect_used)]
static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Z0-9_]+(.)").expect("camel boundary regex should be valid")
});

/// Header names an operation implies on the request and response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationHeaders {
    pub request: Vec<String>,
    pub response: Vec<String>,
}

/// One operation of a definition.
#[derive(Debug, Clone)]
pub struct Operation {
    definition: Arc<Value>,
    path: String,
    method: String,
    schema: Value,
    path_item: Value,
    callback: Option<String>,
    samples: Arc<ExampleCache>,
    repair_mode: RepairMode,
}

impl Operation {
    /// Wrap `schema` as the operation at `path` + `method` of `definition`.
    ///
    /// The path item used for common parameters and summaries is looked up
    /// under `paths`; it is `null` when the path is not declared.
    #[must_use]
    pub fn new(
        definition: Arc<Value>,
        path: impl Into<String>,
        method: impl Into<String>,
        schema: Value,
    ) -> Self {
        let path = path.into();
        let path_item = definition
            .get("paths")
            .and_then(|paths| paths.get(&path))
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            definition,
            path,
            method: method.into().to_ascii_lowercase(),
            schema,
            path_item,
            callback: None,
            samples: Arc::new(ExampleCache::new(0)),
            repair_mode: RepairMode::Lenient,
        }
    }

    /// The operation declared at `path` + `method`, or an empty one.
    #[must_use]
    pub fn lookup(definition: Arc<Value>, path: &str, method: &str) -> Self {
        let schema = definition
            .get("paths")
            .and_then(|paths| paths.get(path))
            .and_then(|item| item.get(method.to_ascii_lowercase()))
            .filter(|schema| schema.is_object())
            .cloned()
            .unwrap_or_else(empty_schema);
        Self::new(definition, path, method, schema)
    }

    /// Replace the path item (webhooks and `$ref`'d path items live elsewhere).
    #[must_use]
    pub(crate) fn with_path_item(mut self, path_item: Value) -> Self {
        self.path_item = path_item;
        self
    }

    /// Share an example cache and repair mode with the owning session.
    #[must_use]
    pub(crate) fn with_session(
        mut self,
        samples: Arc<ExampleCache>,
        repair_mode: RepairMode,
    ) -> Self {
        self.samples = samples;
        self.repair_mode = repair_mode;
        self
    }

    /// Path template (or runtime expression, for callbacks).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lower-cased method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The raw Operation Object.
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    #[must_use]
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    /// Path Item the operation was found in (`null` when there is none).
    #[must_use]
    pub fn path_item(&self) -> &Value {
        &self.path_item
    }

    /// Name of the callback this operation belongs to, if it is one.
    #[must_use]
    pub fn callback_identifier(&self) -> Option<&str> {
        self.callback.as_deref()
    }

    #[must_use]
    pub fn is_callback(&self) -> bool {
        self.callback.is_some()
    }

    fn string_field<'s>(&'s self, key: &str) -> Option<&'s str> {
        self.schema
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| self.path_item.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()))
    }

    /// The operation's summary, else the path item's.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.string_field("summary")
    }

    /// The operation's description, else the path item's.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.string_field("description")
    }

    /// Follow a local `$ref`, returning the node itself when it is not one.
    fn follow<'v>(&'v self, node: &'v Value) -> Option<&'v Value> {
        match node.get("$ref").and_then(Value::as_str) {
            Some(reference) => resolve_pointer(reference, &self.definition),
            None => Some(node),
        }
    }

    fn request_body_object(&self) -> Option<&Map<String, Value>> {
        self.schema
            .get("requestBody")
            .filter(|body| !is_ref(body))
            .and_then(Value::as_object)
    }

    /// Preferred request media type: the first JSON-like one, else the first
    /// XML-like one, else the first declared. `application/json` when there
    /// is no body at all.
    #[must_use]
    pub fn content_type(&self) -> String {
        let types: Vec<&String> = self
            .schema
            .get("requestBody")
            .and_then(|body| self.follow(body))
            .and_then(|body| body.get("content"))
            .and_then(Value::as_object)
            .map(|content| content.keys().collect())
            .unwrap_or_default();

        types
            .iter()
            .find(|t| mime::is_json_like(t))
            .or_else(|| types.iter().find(|t| mime::is_xml_like(t)))
            .or_else(|| types.first())
            .map_or_else(|| "application/json".to_string(), |t| (*t).clone())
    }

    #[must_use]
    pub fn is_form_url_encoded(&self) -> bool {
        mime::is_form_urlencoded(&self.content_type())
    }

    #[must_use]
    pub fn is_multipart(&self) -> bool {
        mime::is_multipart(&self.content_type())
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        mime::is_json_like(&self.content_type())
    }

    #[must_use]
    pub fn is_xml(&self) -> bool {
        mime::is_xml_like(&self.content_type())
    }

    /// Header names implied by security, header parameters and payloads.
    #[must_use]
    pub fn headers(&self) -> OperationHeaders {
        let security = self.prepare_security();
        let mut request: Vec<String> = security
            .get(&SecurityType::Header)
            .map(|schemes| {
                schemes
                    .iter()
                    .filter_map(|s| s.scheme.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if [SecurityType::Bearer, SecurityType::Basic, SecurityType::OAuth2]
            .iter()
            .any(|kind| security.contains_key(kind))
        {
            request.push("Authorization".into());
        }
        if security.contains_key(&SecurityType::Cookie) {
            request.push("Cookie".into());
        }

        if let Some(parameters) = self.schema.get("parameters").and_then(Value::as_array) {
            for param in parameters.iter().filter_map(|p| self.follow(p)) {
                if param.get("in").and_then(Value::as_str) == Some("header") {
                    if let Some(name) = param.get("name").and_then(Value::as_str) {
                        request.push(name.to_string());
                    }
                }
            }
        }

        let responses = self.schema.get("responses").and_then(Value::as_object);
        let mut response: Vec<String> = responses
            .map(|responses| {
                responses
                    .values()
                    .filter_map(|r| r.get("headers").and_then(Value::as_object))
                    .flat_map(|headers| headers.keys().cloned())
                    .collect()
            })
            .unwrap_or_default();

        let has_body_content = self
            .schema
            .get("requestBody")
            .and_then(|body| self.follow(body))
            .and_then(|body| body.get("content"))
            .is_some_and(|content| content.is_object());
        if has_body_content && !request.iter().any(|h| h == "Content-Type") {
            request.push("Content-Type".into());
        }

        if responses.is_some_and(|r| r.values().any(|r| r.get("content").is_some_and(is_truthy))) {
            if !request.iter().any(|h| h == "Accept") {
                request.push("Accept".into());
            }
            if !response.iter().any(|h| h == "Content-Type") {
                response.push("Content-Type".into());
            }
        }

        OperationHeaders { request, response }
    }

    /// `true` when a non-empty `operationId` is declared.
    #[must_use]
    pub fn has_operation_id(&self) -> bool {
        self.schema
            .get("operationId")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty())
    }

    /// The declared `operationId`, or one generated as `<method>_<path>`.
    ///
    /// With `camel_case` the id is camel-cased on non-word characters, and a
    /// generated id is prefixed with the method unless the path already
    /// starts with it (`/get-pets` gives `getPets`, not `getGetPets`).
    #[must_use]
    pub fn operation_id(&self, camel_case: bool) -> String {
        let declared = self
            .schema
            .get("operationId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty());

        let id = match declared {
            Some(id) => id.to_string(),
            None => sanitize(&self.path).to_lowercase(),
        };
        let method = &self.method;

        if !camel_case {
            return match declared {
                Some(_) => id,
                None => format!("{method}_{id}"),
            };
        }

        let camel = CAMEL_BOUNDARY
            .replace_all(&id, |caps: &regex::Captures<'_>| caps[1].to_uppercase())
            .into_owned();
        if declared.is_some() || camel.starts_with(method.as_str()) {
            return camel;
        }
        let mut chars = camel.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{method}{capitalized}")
    }

    /// Tag objects for the operation's tags, with root-level metadata when
    /// the definition declares the tag.
    #[must_use]
    pub fn tags(&self) -> Vec<Value> {
        let Some(tags) = self.schema.get("tags").and_then(Value::as_array) else {
            return Vec::new();
        };
        let declared = self
            .definition
            .get("tags")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        tags.iter()
            .filter_map(Value::as_str)
            .map(|name| {
                declared
                    .iter()
                    .find(|tag| tag.get("name").and_then(Value::as_str) == Some(name))
                    .cloned()
                    .unwrap_or_else(|| json!({ "name": name }))
            })
            .collect()
    }

    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.schema.get("deprecated").is_some_and(is_truthy)
    }

    /// Operation parameters followed by any path-level parameters they do
    /// not override (same `name` and `in`).
    #[must_use]
    pub fn parameters(&self) -> Vec<Value> {
        let own: Vec<Value> = self
            .schema
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let common = self
            .path_item
            .get("parameters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let key = |param: &Value| {
            let param = self.follow(param).unwrap_or(param);
            (
                param.get("name").and_then(Value::as_str).map(str::to_string),
                param.get("in").and_then(Value::as_str).map(str::to_string),
            )
        };
        let overridden: Vec<_> = own.iter().map(key).collect();
        let inherited: Vec<Value> = common
            .iter()
            .filter(|param| !overridden.contains(&key(param)))
            .cloned()
            .collect();

        own.into_iter().chain(inherited).collect()
    }

    #[must_use]
    pub fn has_parameters(&self) -> bool {
        !self.parameters().is_empty()
    }

    #[must_use]
    pub fn has_required_parameters(&self) -> bool {
        self.parameters()
            .iter()
            .any(|param| param.get("required").is_some_and(is_truthy))
    }

    #[must_use]
    pub fn has_request_body(&self) -> bool {
        self.schema.get("requestBody").is_some_and(is_truthy)
    }

    /// Declared request media types; empty for a body that is still a `$ref`.
    #[must_use]
    pub fn request_body_media_types(&self) -> Vec<String> {
        self.request_body_object()
            .and_then(|body| body.get("content"))
            .and_then(Value::as_object)
            .map(|content| content.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// `true` when the body is marked `required`, or when its schema has
    /// required properties.
    #[must_use]
    pub fn has_required_request_body(&self) -> bool {
        let Some(body) = self.request_body_object() else {
            return false;
        };
        if body.get("required").is_some_and(is_truthy) {
            return true;
        }
        self.parameter_schemas(&ParameterSchemaOptions::default(), RepairMode::Lenient)
            .ok()
            .flatten()
            .unwrap_or_default()
            .iter()
            .filter(|group| matches!(group.kind, ParameterGroup::Body | ParameterGroup::FormData))
            .any(|group| {
                group
                    .schema
                    .get("required")
                    .and_then(Value::as_array)
                    .is_some_and(|required| !required.is_empty())
            })
    }

    /// The Media Type Object for `media_type`.
    #[must_use]
    pub fn request_body(&self, media_type: &str) -> Option<&Value> {
        self.request_body_object()?.get("content")?.get(media_type)
    }

    /// The first JSON-like request media type, else the first declared.
    #[must_use]
    pub fn preferred_request_body(&self) -> Option<(&str, &Value)> {
        let content = self.request_body_object()?.get("content")?.as_object()?;
        content
            .iter()
            .find(|(media_type, _)| mime::is_json_like(media_type))
            .or_else(|| content.iter().next())
            .map(|(media_type, media)| (media_type.as_str(), media))
    }

    /// The Response Object for `status`, unless it is missing or a `$ref`.
    #[must_use]
    pub fn response_by_status_code(&self, status: &str) -> Option<&Value> {
        self.schema
            .get("responses")?
            .get(status)
            .filter(|response| !is_ref(response))
    }

    #[must_use]
    pub fn response_status_codes(&self) -> Vec<String> {
        self.schema
            .get("responses")
            .and_then(Value::as_object)
            .map(|responses| responses.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        self.schema.get("callbacks").is_some_and(is_truthy)
    }

    /// The callback operation `identifier` -> `expression` -> `method`.
    #[must_use]
    pub fn callback(&self, identifier: &str, expression: &str, method: &str) -> Option<Operation> {
        let path_item = self.schema.get("callbacks")?.get(identifier)?.get(expression)?;
        let schema = path_item.get(method)?;
        Some(Operation {
            definition: Arc::clone(&self.definition),
            path: expression.to_string(),
            method: method.to_ascii_lowercase(),
            schema: schema.clone(),
            path_item: path_item.clone(),
            callback: Some(identifier.to_string()),
            samples: Arc::clone(&self.samples),
            repair_mode: self.repair_mode,
        })
    }

    /// Every callback operation, or `None` when no callbacks are declared.
    /// Non-method keys in a callback's path item are skipped.
    #[must_use]
    pub fn callbacks(&self) -> Option<Vec<Operation>> {
        if !self.has_callbacks() {
            return None;
        }
        let callbacks = self.schema.get("callbacks").and_then(Value::as_object);
        let mut out = Vec::new();
        for (identifier, expressions) in callbacks.into_iter().flatten() {
            let Some(expressions) = expressions.as_object().filter(|_| !is_ref(expressions)) else {
                continue;
            };
            for (expression, path_item) in expressions {
                let Some(path_item) = path_item.as_object().filter(|_| !is_ref(path_item)) else {
                    continue;
                };
                for method in path_item.keys().filter(|m| is_method(m)) {
                    out.extend(self.callback(identifier, expression, method));
                }
            }
        }
        Some(out)
    }

    /// `true` when the Operation Object carries `extension` (any value).
    #[must_use]
    pub fn has_extension(&self, extension: &str) -> bool {
        self.schema.get(extension).is_some()
    }

    #[must_use]
    pub fn extension(&self, extension: &str) -> Option<&Value> {
        self.schema.get(extension)
    }
}

/// Schema of an operation the definition does not declare.
pub(crate) fn empty_schema() -> Value {
    json!({ "parameters": [] })
}

fn sanitize(id: &str) -> String {
    let dashed = NON_ALPHANUMERIC.replace_all(id, "-");
    let collapsed = REPEATED_DASH.replace_all(&dashed, "-");
    collapsed.trim_matches('-').to_string()
}
