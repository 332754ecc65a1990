//! Responses as JSON Schema: the body plus a `Headers` group.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::Operation;
use crate::error::Result;
use crate::json_schema::{dialect_for, is_primitive, JsonSchemaOptions, SchemaConverter};
use crate::mime;

#[derive(Debug, Clone)]
pub struct ResponseSchemaOptions {
    /// Attach `components` when a discriminator mapping points into them.
    pub include_discriminator_mapping_refs: bool,
}

impl Default for ResponseSchemaOptions {
    fn default() -> Self {
        Self {
            include_discriminator_mapping_refs: true,
        }
    }
}

/// One part of a response as JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSchema {
    /// The body's JSON Schema `type` (`"string"` when it has none), or
    /// `"object"` for headers.
    #[serde(rename = "type")]
    pub kind: Value,
    pub schema: Value,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Operation {
    /// The response for `status` as JSON Schema: a `Response body` entry
    /// when it has content and a `Headers` entry when it declares headers.
    ///
    /// `None` when the status is not declared or yields nothing.
    pub fn response_as_json_schema(
        &self,
        status: &str,
        options: &ResponseSchemaOptions,
    ) -> Result<Option<Vec<ResponseSchema>>> {
        let Some(response) = self.response_by_status_code(status) else {
            return Ok(None);
        };
        let description = response.get("description").and_then(Value::as_str).map(str::to_string);
        let dialect = dialect_for(&self.definition);
        let converter_options = JsonSchemaOptions {
            add_enums_to_descriptions: true,
            hide_write_only: true,
            mode: self.repair_mode,
            ..Default::default()
        };
        let mut converter = SchemaConverter::new(&converter_options);
        let mut out = Vec::new();

        if let Some(media) = response
            .get("content")
            .and_then(Value::as_object)
            .and_then(|content| {
                content
                    .iter()
                    .find(|(media_type, _)| mime::is_json_like(media_type))
                    .or_else(|| content.iter().next())
            })
            .map(|(_, media)| media)
        {
            let raw = media.get("schema").cloned().unwrap_or_else(|| json!({}));
            let mut schema = converter.convert(&raw, "", Vec::new());
            let kind = schema.get("type").cloned().unwrap_or_else(|| json!("string"));
            if !is_primitive(&schema) {
                if let Value::Object(map) = &mut schema {
                    map.insert("$schema".into(), json!(dialect));
                }
            }

            let refs = converter.refs();
            let attach = refs.has_circular()
                || (refs.has_discriminator() && options.include_discriminator_mapping_refs);
            if attach {
                let components = self.definition.get("components");
                if let (Some(components), Value::Object(map)) = (components, &mut schema) {
                    map.insert("components".into(), components.clone());
                }
            }

            out.push(ResponseSchema {
                kind,
                schema,
                label: "Response body",
                description: description.clone(),
            });
        }

        if let Some(headers) = response.get("headers").and_then(Value::as_object) {
            let mut properties = Map::new();
            for (name, header) in headers {
                let Some(header) = self.follow(header) else {
                    continue;
                };
                let Some(raw) = header.get("schema") else {
                    continue;
                };
                let mut converted = converter.convert(raw, "", Vec::new());
                let description = header.get("description");
                if let (Some(text), Value::Object(map)) = (description, &mut converted) {
                    map.insert("description".into(), text.clone());
                }
                properties.insert(name.clone(), converted);
            }
            out.push(ResponseSchema {
                kind: json!("object"),
                schema: json!({"type": "object", "properties": properties}),
                label: "Headers",
                description,
            });
        }

        converter.check_strict()?;
        Ok((!out.is_empty()).then_some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_schema::DRAFT_04;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn operation(responses: Value) -> Operation {
        let definition = json!({
            "openapi": "3.0.0",
            "paths": {"/": {"get": {"responses": responses}}},
            "components": {
                "headers": {"limit": {
                    "description": "Calls per hour",
                    "schema": {"type": "integer"}
                }},
                "schemas": {"node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/node"}}
                }}
            }
        });
        Operation::lookup(Arc::new(definition), "/", "get")
    }

    fn schemas(op: &Operation, status: &str) -> Option<Vec<ResponseSchema>> {
        op.response_as_json_schema(status, &ResponseSchemaOptions::default()).unwrap()
    }

    #[test]
    fn missing_status_is_none() {
        let op = operation(json!({"200": {"description": "OK"}}));
        assert!(schemas(&op, "404").is_none());
        assert!(schemas(&op, "200").is_none());
    }

    #[test]
    fn body_picks_json_and_lists_enums() {
        let op = operation(json!({"200": {
            "description": "OK",
            "content": {
                "application/xml": {"schema": {"type": "integer"}},
                "application/json": {"schema": {"type": "object", "properties": {
                    "status": {"type": "string", "enum": ["available", "sold"]},
                    "secret": {"type": "string", "writeOnly": true}
                }}}
            }
        }}));
        let out = schemas(&op, "200").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, json!("object"));
        assert_eq!(out[0].label, "Response body");
        assert_eq!(out[0].description.as_deref(), Some("OK"));
        assert_eq!(out[0].schema["$schema"], json!(DRAFT_04));
        assert_eq!(
            out[0].schema["properties"]["status"]["description"],
            json!("`available` `sold`")
        );
        assert!(out[0].schema["properties"].get("secret").is_none());
    }

    #[test]
    fn untyped_body_is_a_string() {
        let op = operation(json!({"200": {"description": "OK", "content": {"text/plain": {}}}}));
        let out = schemas(&op, "200").unwrap();
        assert_eq!(out[0].kind, json!("string"));
    }

    #[test]
    fn headers_become_an_object() {
        let op = operation(json!({"200": {
            "description": "OK",
            "headers": {
                "X-Rate-Limit": {"$ref": "#/components/headers/limit"},
                "X-Expires": {"schema": {"type": "string", "format": "date-time"}},
                "X-Opaque": {"description": "no schema"}
            }
        }}));
        let out = schemas(&op, "200").unwrap();
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!([{
                "type": "object",
                "label": "Headers",
                "description": "OK",
                "schema": {"type": "object", "properties": {
                    "X-Rate-Limit": {"type": "integer", "description": "Calls per hour"},
                    "X-Expires": {"type": "string", "format": "date-time"}
                }}
            }])
        );
    }

    #[test]
    fn circular_bodies_carry_components() {
        let op = operation(json!({"200": {"description": "OK", "content": {"application/json": {
            "schema": {"$ref": "#/components/schemas/node"}
        }}}}));
        let out = schemas(&op, "200").unwrap();
        assert_eq!(out[0].schema["$ref"], json!("#/components/schemas/node"));
        assert!(out[0].schema["components"]["schemas"]["node"].is_object());
    }
}
