//! Unit tests for CLI commands

use super::commands::parse_path_filter;
use crate::cli::{execute, Cli, Commands};
use crate::reducer::PathFilter;
use clap::Parser;
use serde_json::json;
use std::fs;

const PETSTORE: &str = r#"
openapi: 3.0.3
info:
  title: Petstore
  version: 1.0.0
servers:
  - url: https://petstore.swagger.io/v2
tags:
  - name: pet
paths:
  /pet/{petId}:
    get:
      operationId: getPetById
      tags: [pet]
      parameters:
        - name: petId
          in: path
          required: true
          schema:
            type: integer
            format: int64
      responses:
        '200':
          description: OK
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
  /store/inventory:
    get:
      tags: [store]
      responses:
        '200':
          description: OK
components:
  schemas:
    Pet:
      type: object
      properties:
        name:
          type: string
"#;

fn write_petstore() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("petstore.yaml");
    fs::write(&path, PETSTORE).unwrap();
    let path = path.to_string_lossy().into_owned();
    (dir, path)
}

#[test]
fn test_find_command_parses() {
    let cli = Cli::try_parse_from([
        "oas-query",
        "-vv",
        "find",
        "--spec",
        "api.yaml",
        "--url",
        "https://example.com/pets",
    ])
    .unwrap();

    assert_eq!(cli.verbose, 2);
    match cli.command {
        Commands::Find { spec, url, method } => {
            assert_eq!(spec.to_string_lossy(), "api.yaml");
            assert_eq!(url, "https://example.com/pets");
            assert!(method.is_none());
        }
        _ => panic!("Expected Find command"),
    }
}

#[test]
fn test_all_commands_parse() {
    let commands = vec![
        vec!["oas-query", "inspect", "--spec", "api.yaml"],
        vec!["oas-query", "find", "-s", "api.yaml", "-u", "https://x/y", "-m", "get"],
        vec![
            "oas-query", "schema", "--spec", "api.yaml", "--path", "/pets", "--method", "post",
            "--merge",
        ],
        vec!["oas-query", "reduce", "--spec", "api.yaml", "--tag", "pet", "--path", "/pets=get"],
        vec!["oas-query", "--strict", "--user", "{}", "inspect", "--spec", "api.yaml"],
    ];

    for args in commands {
        let cli = Cli::try_parse_from(&args);
        assert!(cli.is_ok(), "Failed to parse command: {:?}", args);
    }
}

#[test]
fn test_path_filters() {
    assert_eq!(parse_path_filter("/pets").unwrap(), ("/pets".to_string(), PathFilter::All));
    assert_eq!(parse_path_filter("/pets=*").unwrap(), ("/pets".to_string(), PathFilter::All));
    assert_eq!(
        parse_path_filter("/pets=GET, post").unwrap(),
        ("/pets".to_string(), PathFilter::Methods(vec!["get".into(), "post".into()]))
    );
    assert!(parse_path_filter("=get").is_err());
}

#[tokio::test]
async fn test_inspect_lists_operations() {
    let (_dir, path) = write_petstore();
    let cli = Cli::try_parse_from(["oas-query", "inspect", "--spec", &path]).unwrap();
    let out = execute(&cli).await.unwrap();

    assert_eq!(out["version"], json!("3.0.3"));
    assert_eq!(out["servers"], json!(["https://petstore.swagger.io/v2"]));
    assert_eq!(out["tags"], json!(["pet", "store"]));
    assert_eq!(out["operations"][0]["operationId"], json!("getPetById"));
    assert_eq!(out["operations"][1]["method"], json!("GET"));
}

#[tokio::test]
async fn test_find_reports_slugs() {
    let (_dir, path) = write_petstore();
    let cli = Cli::try_parse_from([
        "oas-query",
        "find",
        "--spec",
        &path,
        "--url",
        "https://petstore.swagger.io/v2/pet/7",
        "--method",
        "get",
    ])
    .unwrap();
    let out = execute(&cli).await.unwrap();
    assert_eq!(out["path"], json!("/pet/:petId"));
    assert_eq!(out["slugs"], json!({":petId": "7"}));
}

#[tokio::test]
async fn test_schema_and_reduce() {
    let (_dir, path) = write_petstore();
    let cli = Cli::try_parse_from([
        "oas-query", "schema", "--spec", &path, "--path", "/pet/{petId}", "--method", "get",
    ])
    .unwrap();
    let out = execute(&cli).await.unwrap();
    assert_eq!(out[0]["type"], json!("path"));
    assert_eq!(out[0]["schema"]["required"], json!(["petId"]));

    let cli = Cli::try_parse_from([
        "oas-query", "schema", "--spec", &path, "--path", "/pet/{petId}", "--method", "get",
        "--status", "200",
    ])
    .unwrap();
    let out = execute(&cli).await.unwrap();
    assert_eq!(out[0]["label"], json!("Response body"));

    let cli = Cli::try_parse_from([
        "oas-query", "schema", "--spec", &path, "--path", "/nope", "--method", "get",
    ])
    .unwrap();
    assert!(execute(&cli).await.is_err());

    let cli =
        Cli::try_parse_from(["oas-query", "reduce", "--spec", &path, "--tag", "store"]).unwrap();
    let out = execute(&cli).await.unwrap();
    assert!(out["paths"].get("/pet/{petId}").is_none());
    assert!(out.get("components").is_none());
}
