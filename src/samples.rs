//! Representative example values generated from a JSON Schema.
//!
//! Used wherever a definition has no hand-written example. Declared
//! `example`s win, then defaults, then canned values per type and format.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde_json::{json, Map, Value};
use tracing::trace;

use crate::json_schema::{is_truthy, merge_all_of};

/// Which properties a generated example includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SampleOptions {
    pub include_read_only: bool,
    pub include_write_only: bool,
}

impl SampleOptions {
    /// Request payloads carry `writeOnly` fields and omit `readOnly` ones.
    #[must_use]
    pub fn request() -> Self {
        Self {
            include_read_only: false,
            include_write_only: true,
        }
    }

    /// Response payloads carry `readOnly` fields and omit `writeOnly` ones.
    #[must_use]
    pub fn response() -> Self {
        Self {
            include_read_only: true,
            include_write_only: false,
        }
    }
}

fn string_sample(format: Option<&str>) -> Value {
    match format {
        Some("email") => json!("user@example.com"),
        Some("date-time") => {
            json!(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        }
        Some("date") => json!(chrono::Utc::now().format("%Y-%m-%d").to_string()),
        Some("uuid") => json!("3fa85f64-5717-4562-b3fc-2c963f66afa6"),
        Some("hostname") => json!("example.com"),
        Some("ipv4") => json!("198.51.100.42"),
        Some("ipv6") => json!("2001:0db8:5b96:0000:0000:426f:8e17:642a"),
        _ => json!("string"),
    }
}

fn primitive(schema: &Map<String, Value>) -> Option<Value> {
    let declared = schema.get("type");
    let kind = match declared {
        Some(Value::String(kind)) => Some(kind.as_str()),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .find(|kind| *kind != "null")
            .or_else(|| kinds.first().and_then(Value::as_str)),
        _ => None,
    };
    let format = schema.get("format").and_then(Value::as_str);

    let sample = match kind {
        Some("null") => Value::Null,
        Some("string") => string_sample(format),
        Some("number" | "integer") => json!(0),
        Some("boolean") => match schema.get("default") {
            Some(Value::Bool(flag)) => Value::Bool(*flag),
            _ => Value::Bool(true),
        },
        Some("file") => return None,
        _ => {
            let shown = declared.map_or_else(|| "undefined".to_string(), |d| match d {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            Value::String(format!("Unknown Type: {shown}"))
        }
    };
    Some(sample)
}

/// Remove `$$ref` bookkeeping keys (string values pointing at a `#` fragment)
/// from an example.
fn strip_ref_markers(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, value)| {
                    !(key.as_str() == "$$ref" && value.as_str().is_some_and(|s| s.contains('#')))
                })
                .map(|(key, value)| (key.clone(), strip_ref_markers(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_ref_markers).collect()),
        other => other.clone(),
    }
}

fn has_type(schema: &Map<String, Value>, wanted: &str) -> bool {
    match schema.get("type") {
        Some(Value::String(kind)) => kind == wanted,
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some(wanted)),
        _ => false,
    }
}

fn flag(schema: &Value, key: &str) -> bool {
    schema.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Produce a representative value for `schema`, or `None` when nothing
/// sensible can be produced (an untyped, shapeless schema or `type: file`).
#[must_use]
pub fn sample_from_schema(schema: &Value, options: &SampleOptions) -> Option<Value> {
    let map = schema.as_object()?;

    if map.contains_key("allOf") {
        let merged = merge_all_of(map).unwrap_or_else(|_| {
            let mut fallback = map.clone();
            fallback.remove("allOf");
            fallback
        });
        return sample_from_schema(&Value::Object(merged), options);
    }

    if let Some(first) = ["oneOf", "anyOf"].iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_array)
            .and_then(|branches| branches.first())
    }) {
        return sample_from_schema(first, options);
    }

    if let Some(example) = map.get("example") {
        return Some(strip_ref_markers(example));
    }
    if let Some(first) = map.get("examples").and_then(Value::as_array).and_then(|e| e.first()) {
        return Some(strip_ref_markers(first));
    }

    let untyped = map.get("type").is_none();
    let is_object = has_type(map, "object")
        || (untyped
            && (map.contains_key("properties") || map.contains_key("additionalProperties")));
    let is_array = has_type(map, "array") || (untyped && map.contains_key("items"));

    if is_object {
        return Some(Value::Object(sample_object(map, options)));
    }

    if is_array {
        let Some(items) = map.get("items") else {
            return Some(Value::Array(Vec::new()));
        };
        let samples = match ["anyOf", "oneOf"]
            .iter()
            .find_map(|key| items.get(*key).and_then(Value::as_array))
        {
            Some(branches) => branches
                .iter()
                .map(|branch| sample_from_schema(branch, options).unwrap_or(Value::Null))
                .collect(),
            None => vec![sample_from_schema(items, options).unwrap_or(Value::Null)],
        };
        return Some(Value::Array(samples));
    }

    if let Some(values) = map.get("enum").and_then(Value::as_array) {
        if let Some(default) = map.get("default").filter(|d| is_truthy(d)) {
            return Some(default.clone());
        }
        return values.first().cloned();
    }

    map.get("type")?;
    if let Some(default) = map.get("default") {
        return Some(default.clone());
    }
    primitive(map)
}

fn sample_object(map: &Map<String, Value>, options: &SampleOptions) -> Map<String, Value> {
    let mut out = Map::new();
    if let Some(properties) = map.get("properties").and_then(Value::as_object) {
        for (name, property) in properties {
            if flag(property, "deprecated")
                || (flag(property, "readOnly") && !options.include_read_only)
                || (flag(property, "writeOnly") && !options.include_write_only)
            {
                continue;
            }
            if let Some(sample) = sample_from_schema(property, options) {
                out.insert(name.clone(), sample);
            }
        }
    }
    match map.get("additionalProperties") {
        Some(Value::Bool(true)) => {
            out.insert("additionalProp".into(), json!({}));
        }
        Some(additional @ Value::Object(_)) => {
            if let Some(sample) = sample_from_schema(additional, options) {
                out.insert("additionalProp".into(), sample);
            }
        }
        _ => {}
    }
    out
}

/// Memoizes [`sample_from_schema`] for one [`Oas`](crate::Oas) session.
///
/// Keys are a hash of the schema's JSON text plus the options, so equal
/// schemas share an entry. A capacity of zero disables caching.
#[derive(Debug)]
pub struct ExampleCache {
    inner: Option<Mutex<LruCache<u64, Option<Value>>>>,
}

impl ExampleCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    fn key(schema: &Value, options: &SampleOptions) -> u64 {
        let mut hasher = DefaultHasher::new();
        schema.to_string().hash(&mut hasher);
        options.hash(&mut hasher);
        hasher.finish()
    }

    /// Cached [`sample_from_schema`].
    #[must_use]
    pub fn sample(&self, schema: &Value, options: &SampleOptions) -> Option<Value> {
        let Some(inner) = &self.inner else {
            return sample_from_schema(schema, options);
        };
        let key = Self::key(schema, options);
        if let Ok(mut cache) = inner.lock() {
            if let Some(hit) = cache.get(&key) {
                trace!(key, "example cache hit");
                return hit.clone();
            }
        }
        let generated = sample_from_schema(schema, options);
        if let Ok(mut cache) = inner.lock() {
            cache.put(key, generated.clone());
        }
        generated
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .as_ref()
            .and_then(|inner| inner.lock().ok().map(|cache| cache.len()))
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ExampleCache {
    fn default() -> Self {
        Self::new(crate::runtime_config::DEFAULT_SAMPLE_CACHE_SIZE)
    }
}
