//! Parameters and request bodies as JSON Schema, one group per location.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::Operation;
use crate::error::Result;
use crate::json_schema::{
    dialect_for, is_primitive, is_truthy, seed_from_media_type, JsonSchemaOptions, RepairMode,
    SchemaConverter,
};
use crate::mime;
use crate::refs::escape_token;

/// Where a group of inputs travels. Variant order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterGroup {
    Path,
    Query,
    Body,
    Cookie,
    FormData,
    Header,
    /// Every non-body group folded together.
    Metadata,
}

impl ParameterGroup {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ParameterGroup::Path => "Path Params",
            ParameterGroup::Query => "Query Params",
            ParameterGroup::Body => "Body Params",
            ParameterGroup::Cookie => "Cookie Params",
            ParameterGroup::FormData => "Form Data",
            ParameterGroup::Header => "Headers",
            ParameterGroup::Metadata => "Metadata",
        }
    }

    fn from_location(location: &str) -> Option<Self> {
        match location {
            "path" => Some(ParameterGroup::Path),
            "query" => Some(ParameterGroup::Query),
            "cookie" => Some(ParameterGroup::Cookie),
            "header" => Some(ParameterGroup::Header),
            _ => None,
        }
    }

    fn is_body(self) -> bool {
        matches!(self, ParameterGroup::Body | ParameterGroup::FormData)
    }
}

/// Deprecated, optional properties split out of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeprecatedProps {
    #[serde(rename = "type")]
    pub kind: ParameterGroup,
    pub schema: Value,
}

/// One group of an operation's inputs as JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: ParameterGroup,
    pub label: &'static str,
    pub schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_props: Option<DeprecatedProps>,
}

/// Knobs for [`Operation::parameters_as_json_schema`].
#[derive(Debug, Clone)]
pub struct ParameterSchemaOptions {
    /// Defaults keyed by JSON pointer (`{"petId": 1}` defaults the `petId` parameter).
    pub global_defaults: Value,
    /// Return the body group plus a single `metadata` group wrapping every
    /// other group in an `allOf`.
    pub merge_into_body_and_metadata: bool,
    /// Leave deprecated properties in place instead of splitting them into
    /// `deprecatedProps`.
    pub retain_deprecated_properties: bool,
    /// Attach `components` when a discriminator mapping points into them.
    pub include_discriminator_mapping_refs: bool,
}

impl Default for ParameterSchemaOptions {
    fn default() -> Self {
        Self {
            global_defaults: Value::Object(Map::new()),
            merge_into_body_and_metadata: false,
            retain_deprecated_properties: false,
            include_discriminator_mapping_refs: true,
        }
    }
}

fn with_dialect(schema: Value, dialect: &str) -> Value {
    match schema {
        Value::Object(mut map) => {
            map.insert("$schema".into(), json!(dialect));
            Value::Object(map)
        }
        other => other,
    }
}

/// Move deprecated, optional properties of `schema` into their own schema.
///
/// `readOnly` properties are removed from `schema` but not listed.
fn split_deprecated(
    schema: &mut Value,
    kind: ParameterGroup,
    dialect: &str,
) -> Option<DeprecatedProps> {
    let properties = schema.get("properties")?.as_object()?;
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let flagged = |prop: &Value, key: &str| prop.get(key).is_some_and(is_truthy);
    let removable =
        |name: &str, prop: &Value| flagged(prop, "deprecated") && !required.contains(&name);

    let deprecated: Map<String, Value> = properties
        .iter()
        .filter(|(name, prop)| removable(name, prop) && !flagged(prop, "readOnly"))
        .map(|(name, prop)| (name.clone(), prop.clone()))
        .collect();
    if deprecated.is_empty() {
        return None;
    }

    let doomed: Vec<String> = properties
        .iter()
        .filter(|(name, prop)| removable(name, prop))
        .map(|(name, _)| name.clone())
        .collect();

    let mut split = schema.clone();
    split["properties"] = Value::Object(deprecated);
    if let Some(Value::Object(properties)) = schema.get_mut("properties") {
        for name in &doomed {
            properties.shift_remove(name);
        }
    }
    Some(DeprecatedProps {
        kind,
        schema: with_dialect(split, dialect),
    })
}

/// Pick the media type a `content`-style parameter is described by.
fn parameter_media_type(content: &Map<String, Value>) -> Option<&Value> {
    if let Some(json) = content.get("application/json") {
        return Some(json);
    }
    content
        .iter()
        .find(|(media_type, _)| mime::is_json_like(media_type))
        .or_else(|| content.iter().next())
        .map(|(_, media)| media)
}

#[derive(Default)]
struct RefsSeen {
    circular: bool,
    discriminator: bool,
}

impl RefsSeen {
    fn absorb(&mut self, converter: &SchemaConverter<'_>) {
        self.circular |= converter.refs().has_circular();
        self.discriminator |= converter.refs().has_discriminator();
    }
}

impl Operation {
    /// Inputs grouped by location as JSON Schema, sorted path, query, body,
    /// cookie, form data, header.
    ///
    /// `None` when the operation has neither parameters nor a request body.
    /// Errors only when the session runs in strict repair mode and a schema
    /// needed repairing.
    pub fn parameters_as_json_schema(
        &self,
        options: &ParameterSchemaOptions,
    ) -> Result<Option<Vec<ParameterSchema>>> {
        self.parameter_schemas(options, self.repair_mode)
    }

    pub(super) fn parameter_schemas(
        &self,
        options: &ParameterSchemaOptions,
        mode: RepairMode,
    ) -> Result<Option<Vec<ParameterSchema>>> {
        if !self.has_parameters() && !self.has_request_body() {
            return Ok(None);
        }
        let dialect = dialect_for(&self.definition);
        let mut seen = RefsSeen::default();

        let body_options = JsonSchemaOptions {
            global_defaults: options.global_defaults.clone(),
            hide_read_only: true,
            mode,
            ..Default::default()
        };
        let mut body_converter = SchemaConverter::new(&body_options);
        let body = self.body_schema(&mut body_converter, options, dialect);
        body_converter.check_strict()?;
        seen.absorb(&body_converter);

        let param_options = JsonSchemaOptions {
            global_defaults: options.global_defaults.clone(),
            mode,
            ..Default::default()
        };
        let mut param_converter = SchemaConverter::new(&param_options);
        let params = self.location_schemas(&mut param_converter, options, dialect);
        param_converter.check_strict()?;
        seen.absorb(&param_converter);

        let mut groups: Vec<ParameterSchema> = body.into_iter().chain(params).collect();

        if seen.circular || (seen.discriminator && options.include_discriminator_mapping_refs) {
            let components = self.components_as_json_schema(&param_options);
            if !components.is_empty() {
                debug!(
                    path = %self.path,
                    method = %self.method,
                    "attaching components for unresolved $refs"
                );
                for group in &mut groups {
                    if let Value::Object(schema) = &mut group.schema {
                        schema.insert("components".into(), Value::Object(components.clone()));
                    }
                }
            }
        }

        groups.sort_by_key(|group| group.kind);

        if options.merge_into_body_and_metadata {
            groups = merge_into_body_and_metadata(groups);
        }
        Ok(Some(groups))
    }

    fn body_schema(
        &self,
        converter: &mut SchemaConverter<'_>,
        options: &ParameterSchemaOptions,
        dialect: &str,
    ) -> Option<ParameterSchema> {
        let (media_type, media) = self.preferred_request_body()?;
        let kind = if mime::is_form_urlencoded(media_type) {
            ParameterGroup::FormData
        } else {
            ParameterGroup::Body
        };
        let raw = media.get("schema")?;
        if raw.as_object().is_some_and(Map::is_empty) {
            return None;
        }

        let seeds = seed_from_media_type(media).into_iter().collect();
        let cleaned = converter.convert(raw, "", seeds);
        if cleaned.as_object().is_some_and(Map::is_empty) {
            return None;
        }

        let mut schema = if is_primitive(&cleaned) {
            cleaned
        } else {
            with_dialect(cleaned, dialect)
        };
        let deprecated_props = if options.retain_deprecated_properties {
            None
        } else {
            split_deprecated(&mut schema, kind, dialect)
        };
        Some(ParameterSchema {
            kind,
            label: kind.label(),
            schema,
            deprecated_props,
        })
    }

    fn location_schemas(
        &self,
        converter: &mut SchemaConverter<'_>,
        options: &ParameterSchemaOptions,
        dialect: &str,
    ) -> Vec<ParameterSchema> {
        let parameters: Vec<Value> = self
            .parameters()
            .iter()
            .filter_map(|param| self.follow(param).cloned())
            .collect();

        [
            ParameterGroup::Path,
            ParameterGroup::Query,
            ParameterGroup::Cookie,
            ParameterGroup::Header,
        ]
        .into_iter()
        .filter_map(|kind| {
            let members: Vec<&Map<String, Value>> = parameters
                .iter()
                .filter_map(Value::as_object)
                .filter(|param| {
                    param
                        .get("in")
                        .and_then(Value::as_str)
                        .and_then(ParameterGroup::from_location)
                        == Some(kind)
                })
                .collect();
            if members.is_empty() {
                return None;
            }

            let mut properties = Map::new();
            let mut required = Vec::new();
            for param in members {
                let Some(name) = param.get("name").and_then(Value::as_str) else {
                    continue;
                };
                let property = parameter_property(param, name, converter, dialect);
                properties.insert(name.to_string(), property);
                if param.get("required").is_some_and(is_truthy) {
                    required.push(json!(name));
                }
            }

            let mut schema = json!({
                "type": "object",
                "properties": properties,
                "required": required,
            });
            let deprecated_props = if options.retain_deprecated_properties {
                None
            } else {
                split_deprecated(&mut schema, kind, dialect)
            };
            Some(ParameterSchema {
                kind,
                label: kind.label(),
                schema,
                deprecated_props,
            })
        })
        .collect()
    }

    /// Every component converted to JSON Schema, empty component types dropped.
    fn components_as_json_schema(&self, options: &JsonSchemaOptions) -> Map<String, Value> {
        let Some(components) = self.definition.get("components").and_then(Value::as_object) else {
            return Map::new();
        };
        let mut converter = SchemaConverter::new(options);
        components
            .iter()
            .filter_map(|(component_type, entries)| {
                let entries = entries.as_object()?;
                if entries.is_empty() {
                    return None;
                }
                let converted = entries
                    .iter()
                    .map(|(name, schema)| (name.clone(), converter.convert(schema, "", Vec::new())))
                    .collect();
                Some((component_type.clone(), Value::Object(converted)))
            })
            .collect()
    }
}

/// The JSON Schema for one parameter, from `schema` or from `content`.
fn parameter_property(
    param: &Map<String, Value>,
    name: &str,
    converter: &mut SchemaConverter<'_>,
    dialect: &str,
) -> Value {
    let raw = match param.get("schema") {
        Some(schema) => Some(schema),
        None => param
            .get("content")
            .and_then(Value::as_object)
            .and_then(parameter_media_type)
            .and_then(|media| media.get("schema")),
    };

    let mut schema = match raw {
        Some(raw) => {
            let mut current = if is_truthy(raw) { raw.clone() } else { json!({}) };
            if let Value::Object(current) = &mut current {
                if let Some(example) = param.get("example").filter(|e| is_truthy(e)) {
                    current.insert("example".into(), example.clone());
                } else if let Some(examples) = param.get("examples").filter(|e| is_truthy(e)) {
                    current.insert("examples".into(), examples.clone());
                }
                if let Some(deprecated) = param.get("deprecated").filter(|d| is_truthy(d)) {
                    current.insert("deprecated".into(), deprecated.clone());
                }
            }
            let location = format!("/{}", escape_token(name));
            let converted = converter.convert(&current, &location, Vec::new());
            if is_primitive(&converted) {
                converted
            } else {
                with_dialect(converted, dialect)
            }
        }
        None => json!({}),
    };

    let description = param.get("description").filter(|d| is_truthy(d));
    if let (Some(description), Value::Object(schema)) = (description, &mut schema) {
        schema.insert("description".into(), description.clone());
    }
    schema
}

fn merge_into_body_and_metadata(groups: Vec<ParameterSchema>) -> Vec<ParameterSchema> {
    let (mut merged, metadata): (Vec<_>, Vec<_>) =
        groups.into_iter().partition(|group| group.kind.is_body());
    if metadata.is_empty() {
        return merged;
    }

    let deprecated: Vec<Value> = metadata
        .iter()
        .filter_map(|group| group.deprecated_props.as_ref().map(|props| props.schema.clone()))
        .collect();
    let schemas: Vec<Value> = metadata.into_iter().map(|group| group.schema).collect();

    merged.push(ParameterSchema {
        kind: ParameterGroup::Metadata,
        label: ParameterGroup::Metadata.label(),
        schema: json!({ "allOf": schemas }),
        deprecated_props: (!deprecated.is_empty()).then(|| DeprecatedProps {
            kind: ParameterGroup::Metadata,
            schema: json!({ "allOf": deprecated }),
        }),
    });
    merged
}
