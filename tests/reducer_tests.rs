#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use indexmap::IndexMap;
use openapi_query::load::load_definition;
use openapi_query::{reduce, OasError, PathFilter, ReduceOptions};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn keys(value: &Value) -> Vec<&str> {
    value.as_object().map(|m| m.keys().map(String::as_str).collect()).unwrap_or_default()
}

#[test]
fn reduce_a_loaded_definition_by_tag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("petstore.yaml");
    std::fs::write(&path, common::PETSTORE).unwrap();
    let definition = load_definition(&path).unwrap();

    let reduced = reduce(
        &definition,
        &ReduceOptions {
            tags: vec!["store".into()],
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(keys(&reduced["paths"]), vec!["/store/order/{orderId}"]);
    assert_eq!(keys(&reduced["components"]["schemas"]), vec!["Order"]);
    // Root-level security keeps its scheme even when no kept operation names it.
    assert_eq!(keys(&reduced["components"]["securitySchemes"]), vec!["petstore_auth"]);
    assert_eq!(
        reduced["tags"],
        json!([{"name": "store", "description": "Access to Petstore orders"}])
    );
    assert_eq!(reduced["info"], definition["info"]);
}

#[test]
fn reduce_by_path_follows_nested_schemas() {
    let mut paths = IndexMap::new();
    paths.insert("/pet/{petId}".to_string(), PathFilter::Methods(vec!["GET".into()]));
    let options = ReduceOptions {
        paths,
        ..Default::default()
    };
    let reduced = reduce(&common::petstore(), &options).unwrap();

    assert_eq!(keys(&reduced["paths"]["/pet/{petId}"]), vec!["parameters", "get"]);
    assert_eq!(keys(&reduced["components"]["schemas"]), vec!["Category", "Pet"]);
    assert_eq!(
        keys(&reduced["components"]["securitySchemes"]),
        vec!["petstore_auth", "api_key"]
    );
}

#[test]
fn reduce_can_remove_everything() {
    let options = ReduceOptions {
        tags: vec!["user".into()],
        ..Default::default()
    };
    assert!(matches!(reduce(&common::petstore(), &options), Err(OasError::AllPathsRemoved)));
}
