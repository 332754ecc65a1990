#![allow(clippy::unwrap_used, clippy::expect_used)]

use openapi_query::dereference::{provenance_ref, tag_component_schemas};
use openapi_query::json_schema::{format_bounds, to_json_schema_strict, SchemaConverter};
use openapi_query::refs::find_schema_definition;
use openapi_query::{to_json_schema, DereferenceOptions, JsonSchemaOptions, OasError, RepairMode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn convert(schema: Value) -> Value {
    to_json_schema(&schema, &JsonSchemaOptions::default())
}

#[test]
fn arrays_without_items_get_an_empty_schema() {
    assert_eq!(convert(json!({"type": "array"})), json!({"type": "array", "items": {}}));
}

#[test]
fn numeric_formats_bring_their_bounds() {
    assert_eq!(
        convert(json!({"type": "integer", "format": "int8"})),
        json!({"type": "integer", "format": "int8", "minimum": -128, "maximum": 127})
    );

    // Out-of-range bounds are clamped, in-range ones left alone.
    assert_eq!(
        convert(json!({"type": "integer", "format": "uint8", "minimum": -5, "maximum": 300})),
        json!({"type": "integer", "format": "uint8", "minimum": 0, "maximum": 255})
    );
    assert_eq!(
        convert(json!({"type": "integer", "format": "int32", "minimum": 1, "maximum": 10})),
        json!({"type": "integer", "format": "int32", "minimum": 1, "maximum": 10})
    );

    let formats = [
        "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32", "uint64", "float", "double",
    ];
    for format in formats {
        assert!(format_bounds(format).is_some(), "{format} has no bounds");
    }
    assert!(format_bounds("decimal").is_none());
}

#[test]
fn unmergeable_all_of_is_dropped() {
    assert_eq!(
        convert(json!({
            "description": "either",
            "allOf": [{"type": "string"}, {"type": "integer"}]
        })),
        json!({"description": "either"})
    );

    let strict = JsonSchemaOptions {
        mode: RepairMode::Strict,
        ..Default::default()
    };
    let conflicting = json!({"allOf": [{"type": "string"}, {"type": "integer"}]});
    let err = to_json_schema_strict(&conflicting, &strict).unwrap_err();
    assert!(matches!(err, OasError::Strict { ref location, .. } if location == "/"));
}

#[test]
fn mergeable_all_of_is_flattened() {
    let out = convert(json!({"allOf": [
        {"type": "object", "properties": {"id": {"type": "integer"}}, "required": ["id"]},
        {"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]}
    ]}));
    assert_eq!(out["type"], json!("object"));
    assert_eq!(out["required"], json!(["id", "name"]));
    assert!(out["properties"]["id"].is_object());
    assert!(out["properties"]["name"].is_object());
    assert!(out.get("allOf").is_none());
}

#[test]
fn conversion_is_idempotent() {
    let inputs = [
        json!({"type": "integer", "format": "int8"}),
        json!({"type": "array"}),
        json!({"type": "object", "properties": {
            "tags": {"type": "array", "items": {"type": "string"}, "example": ["a"]},
            "status": {"type": "string", "enum": ["on", "off", "on"]},
            "meta": {"type": "object"}
        }}),
        json!({"oneOf": [{"type": "string"}, {"type": "number"}]}),
    ];
    for input in inputs {
        let once = convert(input);
        assert_eq!(convert(once.clone()), once);
    }
}

#[test]
fn nested_examples_come_from_the_ancestor_example() {
    let out = convert(json!({
        "type": "object",
        "example": {"name": "doggie", "category": {"id": 4}},
        "properties": {
            "name": {"type": "string"},
            "category": {"type": "object", "properties": {"id": {"type": "integer"}}}
        }
    }));
    assert_eq!(out["properties"]["name"]["examples"], json!(["doggie"]));
    assert_eq!(out["properties"]["category"]["properties"]["id"]["examples"], json!([4]));
}

#[test]
fn arrays_retyped_as_objects_still_normalize_their_properties() {
    let out = convert(json!({
        "type": "array",
        "properties": {
            "n": {"type": "integer", "format": "int8", "example": {"a": 1}},
            "o": {"type": "object"}
        }
    }));
    assert_eq!(out["type"], json!("object"));
    assert_eq!(
        out["properties"]["n"],
        json!({"type": "integer", "format": "int8", "minimum": -128, "maximum": 127})
    );
    assert_eq!(
        out["properties"]["o"],
        json!({"type": "object", "additionalProperties": true})
    );
}

#[test]
fn read_and_write_only_are_hidden_on_request() {
    let schema = json!({"type": "object", "required": ["id", "name"], "properties": {
        "id": {"type": "integer", "readOnly": true},
        "name": {"type": "string"},
        "password": {"type": "string", "writeOnly": true}
    }});
    let hide_read_only = JsonSchemaOptions {
        hide_read_only: true,
        ..Default::default()
    };
    let hide_write_only = JsonSchemaOptions {
        hide_write_only: true,
        ..Default::default()
    };

    let request = to_json_schema(&schema, &hide_read_only);
    assert!(request["properties"].get("id").is_none());
    assert_eq!(request["required"], json!(["name"]));

    let response = to_json_schema(&schema, &hide_write_only);
    assert!(response["properties"].get("password").is_none());
    assert!(response["properties"].get("id").is_some());

    let only_read = json!({
        "type": "object",
        "properties": {"id": {"type": "integer", "readOnly": true}}
    });
    assert_eq!(to_json_schema(&only_read, &hide_read_only), json!({}));
}

#[test]
fn global_defaults_by_pointer() {
    let options = JsonSchemaOptions {
        global_defaults: json!({"category": {"name": "dogs"}}),
        ..Default::default()
    };
    let mut converter = SchemaConverter::new(&options);
    let out = converter.convert(
        &json!({"type": "object", "properties": {
            "category": {"type": "object", "properties": {"name": {"type": "string"}}}
        }}),
        "",
        Vec::new(),
    );
    assert_eq!(out["properties"]["category"]["properties"]["name"]["default"], json!("dogs"));
    assert!(converter.repairs().is_empty());
}

#[test]
fn discriminator_mappings_are_logged() {
    let options = JsonSchemaOptions::default();
    let mut converter = SchemaConverter::new(&options);
    converter.convert(
        &json!({"oneOf": [{"$ref": "#/components/schemas/Cat"}], "discriminator": {
            "propertyName": "petType",
            "mapping": {"cat": "#/components/schemas/Cat"}
        }}),
        "",
        Vec::new(),
    );
    assert!(converter.refs().has_discriminator());
    assert!(converter.refs().has_circular());
}

#[test]
fn provenance_reproduces_the_ref() {
    let mut doc = json!({"components": {"schemas": {
        "Pet": {"type": "object"},
        "Pet/Error": {"type": "string"}
    }}});
    for options in [
        DereferenceOptions::default(),
        DereferenceOptions { preserve_ref_as_json_schema_title: true },
    ] {
        tag_component_schemas(&mut doc, &options);
        for reference in ["#/components/schemas/Pet", "#/components/schemas/Pet~1Error"] {
            let resolved = find_schema_definition(reference, &doc).unwrap().unwrap();
            assert_eq!(provenance_ref(&resolved, &options).as_deref(), Some(reference));
        }
    }

    assert!(find_schema_definition("", &doc).unwrap().is_none());
    let err = find_schema_definition("#/components/schemas/Pet/Error", &doc).unwrap_err();
    assert_eq!(err.to_string(), "Could not find a definition for #/components/schemas/Pet/Error.");
}
