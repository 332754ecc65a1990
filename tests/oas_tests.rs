#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::join_all;
use openapi_query::{
    DereferenceOptions, DereferenceState, Dereferencer, LocalDereferencer, Oas, OasError,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

/// Counts calls and remembers what it was handed.
#[derive(Default)]
struct CountingDereferencer {
    calls: AtomicUsize,
    fail_first: bool,
    received: Mutex<Vec<Value>>,
}

#[async_trait]
impl Dereferencer for CountingDereferencer {
    async fn dereference(&self, definition: Value) -> openapi_query::Result<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(definition.clone());
        // Give concurrent callers a chance to pile up behind this pass.
        tokio::task::yield_now().await;
        if self.fail_first && call == 0 {
            return Err(OasError::Dereference("upstream unavailable".into()));
        }
        LocalDereferencer.dereference(definition).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dereferences_share_one_pass() {
    let counter = Arc::new(CountingDereferencer::default());
    let dereferencer = Arc::clone(&counter) as Arc<dyn Dereferencer>;
    let oas = Arc::new(Oas::new(common::petstore(), json!({})).with_dereferencer(dereferencer));

    let calls = (0..3).map(|_| {
        let oas = Arc::clone(&oas);
        async move { oas.dereference(DereferenceOptions::default()).await }
    });
    for result in join_all(calls).await {
        result.unwrap();
    }
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(oas.dereference_state(), DereferenceState::Complete);

    oas.dereference(DereferenceOptions::default()).await.unwrap();
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_pass_can_be_retried() {
    let flaky = Arc::new(CountingDereferencer {
        fail_first: true,
        ..Default::default()
    });
    let dereferencer = Arc::clone(&flaky) as Arc<dyn Dereferencer>;
    let oas = Oas::new(common::petstore(), json!({})).with_dereferencer(dereferencer);

    let err = oas.dereference(DereferenceOptions::default()).await.unwrap_err();
    assert!(err.to_string().contains("upstream unavailable"));
    assert_eq!(oas.dereference_state(), DereferenceState::NotStarted);

    oas.dereference(DereferenceOptions::default()).await.unwrap();
    assert_eq!(oas.dereference_state(), DereferenceState::Complete);
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn user_context_never_reaches_the_dereferencer() {
    let counter = Arc::new(CountingDereferencer::default());
    let user = json!({"keys": [{"name": "app", "api_key": "secret-token-123"}]});
    let dereferencer = Arc::clone(&counter) as Arc<dyn Dereferencer>;
    let oas = Oas::new(common::petstore(), user.clone()).with_dereferencer(dereferencer);
    oas.dereference(DereferenceOptions::default()).await.unwrap();

    let received = counter.received.lock().unwrap();
    assert!(!received[0].to_string().contains("secret-token-123"));
    assert_eq!(oas.user(), &user);
    assert_eq!(oas.get_auth(Some("app"))["api_key"], json!("secret-token-123"));
}

#[tokio::test]
async fn provenance_can_be_recorded_as_title() {
    let oas = Oas::new(common::petstore(), json!({}));
    oas.dereference(DereferenceOptions {
        preserve_ref_as_json_schema_title: true,
    })
    .await
    .unwrap();

    let op = oas.operation("/store/order/{orderId}", "get");
    let schema = op
        .schema()
        .pointer("/responses/200/content/application~1json/schema")
        .unwrap();
    assert_eq!(schema["title"], json!("Order"));
    assert!(schema.get("x-ref-name").is_none());
}

#[test]
fn server_urls_take_defaults_then_user_values() {
    let oas = Oas::new(common::petstore(), json!({}));
    assert_eq!(oas.url(0, None), "http://petstore.swagger.io/v2");
    assert_eq!(oas.url(1, None), "https://demo.example.com:443/v2");

    let oas = Oas::new(
        common::petstore(),
        json!({"name": "subdomain", "port": "8080", "basePath": "v3"}),
    );
    assert_eq!(oas.url(1, None), "https://subdomain.example.com:8080/v3");
    assert_eq!(
        oas.default_variables(1),
        json!({"name": "subdomain", "port": "8080", "basePath": "v3"}).as_object().cloned().unwrap()
    );
}

#[test]
fn split_url_and_variables() {
    let oas = Oas::new(common::petstore(), json!({}));
    let chunks: Vec<(String, String)> = oas
        .split_url(1)
        .iter()
        .map(|chunk| (chunk.key().to_string(), chunk.value().to_string()))
        .collect();
    assert_eq!(chunks[0], ("https://-0".to_string(), "https://".to_string()));
    assert_eq!(chunks[1], ("name-1".to_string(), "name".to_string()));

    let selection = oas.split_variables("https://buster.example.com:3000/pet").unwrap();
    assert_eq!(selection.selected, 1);
    assert_eq!(selection.variables["name"], json!("buster"));
    assert_eq!(selection.variables["basePath"], json!("pet"));
    assert!(oas.split_variables("ftp://nowhere").is_none());
}

#[test]
fn operations_resolve_from_urls() {
    let oas = Oas::new(common::petstore(), json!({}));

    let found = oas.find_operation("http://petstore.swagger.io/v2/pet/1", "delete").unwrap();
    assert_eq!(found.url.path, "/pet/:petId");
    assert_eq!(found.url.non_normalized_path, "/pet/{petId}");
    assert_eq!(found.url.slug(":petId"), Some("1"));
    assert_eq!(found.url.method.as_ref().map(|m| m.as_str()), Some("DELETE"));

    let literal = oas
        .find_operation("http://petstore.swagger.io/v2/pet/findByStatus", "get")
        .unwrap();
    assert_eq!(literal.url.non_normalized_path, "/pet/findByStatus");
    assert!(literal.url.slugs.is_empty());

    let templated = oas
        .find_operation("https://demo.example.com:443/v2/store/order/12", "get")
        .unwrap();
    assert_eq!(templated.url.slug("orderId"), Some("12"));

    let op = oas.get_operation("http://petstore.swagger.io/v2/pet/1", "get").unwrap();
    assert_eq!(op.operation_id(false), "getPetById");
    assert!(oas.find_operation("http://petstore.swagger.io/v2/unknown", "get").is_none());
    assert!(oas.find_operation_without_method("http://petstore.swagger.io/v2/pet").is_some());
}

#[test]
fn missing_definitions_are_tolerated() {
    for definition in [Value::Null, json!({})] {
        let oas = Oas::new(definition, json!({}));
        assert!(oas.paths().is_empty());
        assert!(oas.tags(true).is_empty());
        assert!(oas.find_operation("https://example.com/pets", "get").is_none());
        assert!(matches!(oas.version(), Err(OasError::UnrecognizedVersion)));
        assert!(!oas.operation("/pets", "get").has_parameters());
    }
}

#[test]
fn tags_and_paths() {
    let oas = Oas::new(common::petstore(), json!({}));
    assert_eq!(oas.tags(false), vec!["pet", "store"]);

    let paths = oas.paths();
    assert_eq!(
        paths.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["/pet", "/pet/findByStatus", "/pet/{petId}", "/store/order/{orderId}"]
    );
    assert_eq!(
        paths["/pet/{petId}"].keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["get", "delete"]
    );
}
