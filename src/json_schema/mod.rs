//! # JSON Schema Module
//!
//! Converts OpenAPI Schema Objects into plain JSON Schema.
//!
//! ## Overview
//!
//! OpenAPI schemas found in the wild are frequently malformed: `type` is
//! missing, arrays lack `items`, objects are typed as arrays, `allOf`
//! branches contradict each other. The converter repairs what it can and
//! drops what it cannot, so that downstream form builders and validators
//! always receive something usable.
//!
//! ## Architecture
//!
//! Every node is first classified into a [`SchemaKind`]. Booleans and `$ref`
//! pointers short-circuit. Composition keywords are handled next (`allOf`
//! merged, `oneOf`/`anyOf` branches converted individually with any sibling
//! `properties`/`items` hoisted into them). After type repair the node is
//! re-classified and dispatched as an object, array or primitive.
//!
//! `$ref` pointers are never followed: by the time a schema reaches this
//! module it has been dereferenced, so any `$ref` still present is circular
//! and is passed through untouched (and recorded in the [`RefLog`]).
//!
//! ## Example
//!
//! ```rust
//! use openapi_query::json_schema::{to_json_schema, JsonSchemaOptions};
//! use serde_json::json;
//!
//! let options = JsonSchemaOptions::default();
//! let schema = to_json_schema(&json!({"type": "integer", "format": "int8"}), &options);
//! assert_eq!(
//!     schema,
//!     json!({"type": "integer", "format": "int8", "minimum": -128, "maximum": 127})
//! );
//! ```

mod bounds;
mod examples;
mod merge;

use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use crate::error::{OasError, Result};
use crate::refs::{escape_token, is_ref};

pub use bounds::format_bounds;
pub(crate) use merge::merge_all_of;
pub use examples::{is_primitive, is_truthy, search_for_value_by_pointer, seed_from_media_type};

/// `$schema` for schemas derived from OpenAPI 3.0 documents.
pub const DRAFT_04: &str = "http://json-schema.org/draft-04/schema#";
/// `$schema` for schemas derived from OpenAPI 3.1 documents.
pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema#";

/// The `$schema` dialect for schemas taken from `definition`.
#[must_use]
pub fn dialect_for(definition: &Value) -> &'static str {
    match definition.get("openapi").and_then(Value::as_str) {
        Some(version) if version.starts_with("3.1") => DRAFT_2020_12,
        _ => DRAFT_04,
    }
}

/// OpenAPI-only keywords with no JSON Schema meaning.
const UNSUPPORTED_KEYWORDS: &[&str] = &["example", "nullable", "xml", "externalDocs"];

/// Keywords whose presence makes an object a schema rather than a bag of annotations.
const SCHEMA_KEYWORDS: &[&str] = &[
    "type",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "items",
    "properties",
    "additionalProperties",
];

/// How the converter treats input that needs repairing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepairMode {
    /// Repair silently (logged at debug level).
    #[default]
    Lenient,
    /// Report the first repair as [`OasError::Strict`] via [`to_json_schema_strict`].
    Strict,
}

/// Composition keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composer {
    All,
    Any,
    One,
}

/// Shape of a raw schema node, decided up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// `true`: anything validates.
    BooleanTrue,
    /// `{"$ref": ...}` left behind by dereferencing.
    Reference,
    /// Carries `allOf`, `anyOf` or `oneOf` (first one present, in that order).
    Composition(Composer),
    Object,
    Array,
    Primitive,
    /// No type and nothing to infer one from (a bare `{description}`, `false`, a scalar).
    Shapeless,
}

fn has_type(schema: &Map<String, Value>, wanted: &str) -> bool {
    match schema.get("type") {
        Some(Value::String(name)) => name == wanted,
        Some(Value::Array(names)) => names.iter().any(|n| n.as_str() == Some(wanted)),
        _ => false,
    }
}

fn is_polymorphic(schema: &Map<String, Value>) -> bool {
    ["allOf", "anyOf", "oneOf"].iter().any(|k| schema.contains_key(*k))
}

fn is_schema(schema: &Map<String, Value>) -> bool {
    SCHEMA_KEYWORDS.iter().any(|k| schema.contains_key(*k))
}

/// Classify a raw node.
///
/// A declared `type` wins over inference; without one, `properties` implies
/// an object and `items` an array.
#[must_use]
pub fn classify(node: &Value) -> SchemaKind {
    let map = match node {
        Value::Bool(true) => return SchemaKind::BooleanTrue,
        Value::Object(map) => map,
        _ => return SchemaKind::Shapeless,
    };
    if is_ref(node) {
        return SchemaKind::Reference;
    }
    for (key, composer) in [
        ("allOf", Composer::All),
        ("anyOf", Composer::Any),
        ("oneOf", Composer::One),
    ] {
        if map.get(key).is_some_and(Value::is_array) {
            return SchemaKind::Composition(composer);
        }
    }
    if has_type(map, "object") {
        SchemaKind::Object
    } else if has_type(map, "array") {
        SchemaKind::Array
    } else if map.contains_key("type") {
        SchemaKind::Primitive
    } else if map.contains_key("properties") {
        SchemaKind::Object
    } else if map.contains_key("items") {
        SchemaKind::Array
    } else {
        SchemaKind::Shapeless
    }
}

/// Knobs for [`to_json_schema`].
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaOptions {
    /// Append `` `a` `b` `` listings of enum values to descriptions.
    pub add_enums_to_descriptions: bool,
    /// Values keyed by JSON pointer (relative to the converted root) that become `default`s.
    pub global_defaults: Value,
    /// Drop `readOnly` properties (request bodies).
    pub hide_read_only: bool,
    /// Drop `writeOnly` properties (responses).
    pub hide_write_only: bool,
    pub mode: RepairMode,
}

/// Why a `$ref` was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// A circular `$ref` left in place.
    Circular,
    /// A `discriminator.mapping` target.
    Discriminator,
}

/// `$ref` pointers encountered during conversion.
#[derive(Debug, Clone, Default)]
pub struct RefLog {
    entries: Vec<(String, RefKind)>,
}

impl RefLog {
    fn record(&mut self, reference: &str, kind: RefKind) {
        trace!(reference = %reference, ?kind, "ref encountered");
        self.entries.push((reference.to_string(), kind));
    }

    #[must_use]
    pub fn has_circular(&self) -> bool {
        self.entries.iter().any(|(_, k)| *k == RefKind::Circular)
    }

    #[must_use]
    pub fn has_discriminator(&self) -> bool {
        self.entries.iter().any(|(_, k)| *k == RefKind::Discriminator)
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, RefKind)] {
        &self.entries
    }
}

/// A repair applied to malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub location: String,
    pub reason: String,
}

/// Stateful converter. One instance can convert several related schemas
/// (every parameter group of an operation, say) while accumulating a single
/// [`RefLog`].
#[derive(Debug)]
pub struct SchemaConverter<'o> {
    options: &'o JsonSchemaOptions,
    prev_examples: Vec<Value>,
    prev_defaults: Vec<Value>,
    refs: RefLog,
    repairs: Vec<Repair>,
}

impl<'o> SchemaConverter<'o> {
    #[must_use]
    pub fn new(options: &'o JsonSchemaOptions) -> Self {
        Self {
            options,
            prev_examples: Vec::new(),
            prev_defaults: Vec::new(),
            refs: RefLog::default(),
            repairs: Vec::new(),
        }
    }

    /// Convert `schema` rooted at JSON pointer `location`, seeding the
    /// ancestor example list with `seeds` (e.g. a media type's example).
    pub fn convert(&mut self, schema: &Value, location: &str, seeds: Vec<Value>) -> Value {
        self.prev_examples = seeds;
        self.prev_defaults.clear();
        self.walk(schema, location)
    }

    #[must_use]
    pub fn refs(&self) -> &RefLog {
        &self.refs
    }

    #[must_use]
    pub fn repairs(&self) -> &[Repair] {
        &self.repairs
    }

    /// In [`RepairMode::Strict`], fail with the first repair made so far.
    pub fn check_strict(&self) -> Result<()> {
        if self.options.mode != RepairMode::Strict {
            return Ok(());
        }
        match self.repairs.first() {
            Some(first) => Err(OasError::Strict {
                location: if first.location.is_empty() {
                    "/".into()
                } else {
                    first.location.clone()
                },
                reason: first.reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn repair(&mut self, location: &str, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(location = %location, reason = %reason, "repaired schema");
        self.repairs.push(Repair {
            location: location.to_string(),
            reason,
        });
    }

    fn walk(&mut self, data: &Value, location: &str) -> Value {
        let kind = classify(data);
        let mut schema = match (kind, data) {
            (SchemaKind::BooleanTrue, _) => return Value::Object(Map::new()),
            (SchemaKind::Reference, _) => return self.circular(data),
            (_, Value::Object(map)) => map.clone(),
            (_, other) => return other.clone(),
        };

        if let SchemaKind::Composition(_) = kind {
            if schema.get("allOf").is_some_and(Value::is_array) {
                match merge::merge_all_of(&schema) {
                    Ok(merged) => schema = merged,
                    Err(conflict) => {
                        self.repair(location, format!("dropped unmergeable allOf: {}", conflict.0));
                        schema.remove("allOf");
                    }
                }
                if schema.get("$ref").is_some_and(Value::is_string) {
                    return self.circular(&Value::Object(schema));
                }
            }
            self.hoist_into_alternatives(&mut schema, location);
        }
        self.log_discriminator(&schema);

        if !schema.contains_key("type")
            && !is_polymorphic(&schema)
            && !schema.contains_key("content")
        {
            if schema.contains_key("properties") {
                schema.insert("type".into(), json!("object"));
                self.repair(location, "added missing `type: object`");
            } else if schema.contains_key("items") {
                schema.insert("type".into(), json!("array"));
                self.repair(location, "added missing `type: array`");
            }
        }

        if is_schema(&schema) {
            if has_type(&schema, "integer") || has_type(&schema, "number") {
                bounds::apply_format_bounds(&mut schema);
            }

            examples::reshape_examples(&mut schema, &mut self.prev_examples);
            if !has_type(&schema, "array")
                && !has_type(&schema, "object")
                && !schema.contains_key("examples")
            {
                examples::inherit_example(&mut schema, location, &self.prev_examples);
            }

            if has_type(&schema, "array") {
                self.walk_array(&mut schema, location);
            }
            // `walk_array` may have retyped the node as an object.
            if has_type(&schema, "object") && self.walk_object(&mut schema, location) {
                return Value::Object(Map::new());
            }
        }

        self.apply_defaults(&mut schema, location);

        if is_schema(&schema) {
            if let Some(Value::Array(values)) = schema.get("enum") {
                let mut unique: Vec<Value> = Vec::with_capacity(values.len());
                for value in values {
                    if !unique.contains(value) {
                        unique.push(value.clone());
                    }
                }
                if self.options.add_enums_to_descriptions {
                    append_enum_description(&mut schema, &unique);
                }
                schema.insert("enum".into(), Value::Array(unique));
            }
        }

        self.apply_global_default(&mut schema, location);

        if schema.contains_key("anyOf") || schema.contains_key("oneOf") {
            schema.remove("properties");
            schema.remove("items");
        }

        for keyword in UNSUPPORTED_KEYWORDS {
            schema.remove(*keyword);
        }

        let flagged = |key: &str| schema.get(key).and_then(Value::as_bool).unwrap_or(false);
        if (self.options.hide_read_only && flagged("readOnly"))
            || (self.options.hide_write_only && flagged("writeOnly"))
        {
            return Value::Object(Map::new());
        }

        Value::Object(schema)
    }

    fn circular(&mut self, node: &Value) -> Value {
        let reference = node.get("$ref").and_then(Value::as_str).unwrap_or_default();
        self.refs.record(reference, RefKind::Circular);
        json!({ "$ref": reference })
    }

    /// Convert each `anyOf`/`oneOf` branch, wrapping it in an `allOf` with
    /// the parent's `properties` (or `items`) so every alternative is complete.
    fn hoist_into_alternatives(&mut self, schema: &mut Map<String, Value>, location: &str) {
        for keyword in ["anyOf", "oneOf"] {
            let Some(Value::Array(branches)) = schema.get(keyword).cloned() else {
                continue;
            };
            let properties = schema.get("properties").cloned();
            let items = schema.get("items").cloned();
            let required = schema.get("required").cloned();

            let converted = branches
                .iter()
                .enumerate()
                .map(|(idx, branch)| {
                    let wrapped = if let Some(properties) = &properties {
                        let mut wrapper = Map::new();
                        if let Some(required) = &required {
                            wrapper.insert("required".into(), required.clone());
                        }
                        wrapper.insert(
                            "allOf".into(),
                            json!([branch, { "properties": properties }]),
                        );
                        Value::Object(wrapper)
                    } else if let Some(items) = &items {
                        json!({ "allOf": [branch, { "items": items }] })
                    } else {
                        branch.clone()
                    };

                    let mut out = self.walk(&wrapped, &format!("{location}/{idx}"));
                    if let Value::Object(map) = &mut out {
                        if map.get("required").is_some_and(Value::is_boolean) {
                            map.remove("required");
                        }
                    }
                    out
                })
                .collect();
            schema.insert(keyword.into(), Value::Array(converted));
        }
    }

    fn log_discriminator(&mut self, schema: &Map<String, Value>) {
        let Some(mapping) = schema
            .get("discriminator")
            .and_then(|d| d.get("mapping"))
            .and_then(Value::as_object)
        else {
            return;
        };
        for target in mapping.values().filter_map(Value::as_str) {
            self.refs.record(target, RefKind::Discriminator);
        }
    }

    fn walk_array(&mut self, schema: &mut Map<String, Value>, location: &str) {
        match schema.get("items").cloned() {
            Some(items) => {
                let lone_ref = items.as_object().is_some_and(|m| m.len() == 1) && is_ref(&items);
                if lone_ref {
                    let reference = items.get("$ref").and_then(Value::as_str).unwrap_or_default();
                    self.refs.record(reference, RefKind::Circular);
                } else if items != Value::Bool(true) {
                    let mut converted = self.walk(&items, &format!("{location}/0"));
                    if let Value::Object(map) = &mut converted {
                        if map.get("required").is_some_and(|r| !r.is_array()) {
                            map.remove("required");
                        }
                    }
                    schema.insert("items".into(), converted);
                }
            }
            None if schema.contains_key("properties")
                || schema.contains_key("additionalProperties") =>
            {
                schema.insert("type".into(), json!("object"));
                self.repair(location, "retyped array with `properties` as object");
            }
            None => {
                schema.insert("items".into(), json!({}));
                self.repair(location, "added empty `items` to array");
            }
        }
    }

    /// Returns `true` when every property was hidden and the whole object
    /// should collapse to `{}`.
    fn walk_object(&mut self, schema: &mut Map<String, Value>, location: &str) -> bool {
        let hiding = self.options.hide_read_only || self.options.hide_write_only;

        if let Some(Value::Object(properties)) = schema.get("properties").cloned() {
            let mut converted = Map::with_capacity(properties.len());
            let mut newly_required = Vec::new();
            let mut hidden = Vec::new();

            for (name, raw) in properties {
                if !(raw.is_object() || raw.is_array()) {
                    converted.insert(name, raw);
                    continue;
                }
                let mut out = self.walk(&raw, &format!("{location}/{}", escape_token(&name)));

                let emptied = out.as_object().is_some_and(Map::is_empty);
                let was_empty = match &raw {
                    Value::Object(m) => m.is_empty(),
                    Value::Array(a) => a.is_empty(),
                    _ => true,
                };
                if hiding && emptied && !was_empty {
                    hidden.push(name);
                    continue;
                }

                if let Value::Object(map) = &mut out {
                    if let Some(Value::Bool(flag)) = map.remove("required") {
                        if flag {
                            newly_required.push(Value::String(name.clone()));
                        }
                    }
                }
                converted.insert(name, out);
            }

            if !newly_required.is_empty() {
                let required = schema.entry("required").or_insert_with(|| json!([]));
                if !required.is_array() {
                    *required = json!([]);
                }
                if let Value::Array(list) = required {
                    list.extend(newly_required);
                }
            }
            if !hidden.is_empty() {
                if let Some(Value::Array(list)) = schema.get_mut("required") {
                    list.retain(|r| r.as_str().is_none_or(|n| !hidden.iter().any(|h| h == n)));
                }
            }

            let all_hidden = hiding && converted.is_empty();
            schema.insert("properties".into(), Value::Object(converted));
            if all_hidden {
                return true;
            }
        }

        if let Some(Value::Object(additional)) = schema.get("additionalProperties").cloned() {
            let shapeless = !additional.contains_key("type")
                && !additional.contains_key("$ref")
                && !is_polymorphic(&additional);
            let replacement = if shapeless {
                Value::Bool(true)
            } else {
                self.walk(&Value::Object(additional), location)
            };
            schema.insert("additionalProperties".into(), replacement);
        }

        if !is_polymorphic(schema)
            && !schema.contains_key("properties")
            && !schema.contains_key("additionalProperties")
        {
            schema.insert("additionalProperties".into(), Value::Bool(true));
            self.repair(location, "added `additionalProperties: true` to shapeless object");
        }
        false
    }

    fn apply_defaults(&mut self, schema: &mut Map<String, Value>, location: &str) {
        match schema.get("default").cloned() {
            Some(default) => {
                if default.is_object() {
                    self.prev_defaults.push(default.clone());
                }
                let allow_empty = schema
                    .get("allowEmptyValue")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if has_type(schema, "object") || (default == json!("") && !allow_empty) {
                    schema.remove("default");
                }
            }
            None if !self.prev_defaults.is_empty() => {
                if let Some(found) = search_for_value_by_pointer(location, &self.prev_defaults) {
                    let usable = is_primitive(&found)
                        || found.is_null()
                        || (found.is_array() && has_type(schema, "array"));
                    if usable {
                        schema.insert("default".into(), found);
                    }
                }
            }
            None => {}
        }
    }

    fn apply_global_default(&self, schema: &mut Map<String, Value>, location: &str) {
        let defaults = &self.options.global_defaults;
        if location.is_empty() || defaults.as_object().is_none_or(Map::is_empty) {
            return;
        }
        if let Some(found) = defaults.pointer(location).filter(|v| is_truthy(v)) {
            schema.insert("default".into(), found.clone());
        }
    }
}

fn append_enum_description(schema: &mut Map<String, Value>, values: &[Value]) {
    let listing = values
        .iter()
        .filter(|v| is_truthy(v))
        .map(|v| match v {
            Value::String(s) => format!("`{s}`"),
            other => format!("`{other}`"),
        })
        .collect::<Vec<_>>()
        .join(" ");
    if listing.is_empty() {
        return;
    }
    let description = match schema.get("description").and_then(Value::as_str) {
        Some(existing) => format!("{existing}\n\n{listing}"),
        None => listing,
    };
    schema.insert("description".into(), Value::String(description));
}

/// Convert an OpenAPI Schema Object into JSON Schema, repairing as needed.
///
/// Never fails: malformed but traversable input is repaired or passed through.
#[must_use]
pub fn to_json_schema(schema: &Value, options: &JsonSchemaOptions) -> Value {
    SchemaConverter::new(options).convert(schema, "", Vec::new())
}

/// Like [`to_json_schema`], but in [`RepairMode::Strict`] the first repair
/// the converter had to make is reported as an error.
pub fn to_json_schema_strict(schema: &Value, options: &JsonSchemaOptions) -> Result<Value> {
    let mut converter = SchemaConverter::new(options);
    let converted = converter.convert(schema, "", Vec::new());
    converter.check_strict()?;
    Ok(converted)
}
