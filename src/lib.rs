//! # openapi-query
//!
//! **openapi-query** answers questions about an OpenAPI 3.0/3.1 definition:
//! which operation a concrete URL lands on, what an operation's inputs and
//! outputs look like as JSON Schema, and what example payloads it takes.
//!
//! ## Overview
//!
//! Definitions are plain [`serde_json::Value`] trees. Nothing is validated up
//! front; unusual but traversable documents are tolerated and malformed
//! schemas are repaired on the way to JSON Schema (or rejected, in strict
//! mode).
//!
//! ## Architecture
//!
//! - **[`oas`]** - the [`Oas`] façade: one definition, one user, one dereference
//! - **[`operation`]** - read-only [`Operation`] views with schema and example builders
//! - **[`matcher`]** - URL + method to path template, server variable templating
//! - **[`json_schema`]** - OpenAPI Schema Object to JSON Schema normalization
//! - **[`dereference`]** - the [`Dereferencer`] seam and a local implementation
//! - **[`samples`]** - example generation with a session-scoped cache
//! - **[`refs`]** / **[`mime`]** - JSON pointer and media type helpers
//! - **[`reducer`]** - shrink a definition to selected tags and paths
//! - **[`load`]** - read YAML/JSON definitions from disk
//! - **[`cli`]** - the `oas-query` command line
//!
//! ### Lookup Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Oas
//!     participant Matcher as matcher
//!     participant Op as Operation
//!     participant Norm as json_schema
//!
//!     Caller->>Oas: dereference().await
//!     Oas->>Oas: tag component schemas
//!     Oas->>Oas: Dereferencer (once per session)
//!     Caller->>Oas: get_operation(url, method)
//!     Oas->>Matcher: find_operation
//!     Matcher-->>Oas: MatchedRoute {path, slugs}
//!     Oas-->>Caller: Operation
//!     Caller->>Op: parameters_as_json_schema()
//!     Op->>Norm: SchemaConverter::convert per group
//!     Norm-->>Op: JSON Schema + $ref log
//!     Op-->>Caller: Vec<ParameterSchema>
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use openapi_query::Oas;
//! use serde_json::json;
//!
//! let oas = Oas::new(
//!     json!({
//!         "openapi": "3.0.3",
//!         "servers": [{"url": "https://petstore.swagger.io/v2"}],
//!         "paths": {"/pet/{petId}": {"delete": {"parameters": [
//!             {"name": "petId", "in": "path", "required": true, "schema": {"type": "integer"}}
//!         ]}}}
//!     }),
//!     json!({}),
//! );
//!
//! let found = oas.find_operation("https://petstore.swagger.io/v2/pet/1", "delete").unwrap();
//! assert_eq!(found.url.slug("petId"), Some("1"));
//!
//! let op = oas.get_operation("https://petstore.swagger.io/v2/pet/1", "delete").unwrap();
//! let groups = op.parameters_as_json_schema(&Default::default()).unwrap().unwrap();
//! assert_eq!(groups[0].label, "Path Params");
//! ```
//!
//! ## Configuration
//!
//! Session behaviour is read from the environment by
//! [`runtime_config::RuntimeConfig::from_env`]; logging for the binary by
//! [`logging::LogConfig::from_env`]. The library itself only emits
//! `tracing` events.

pub mod auth;
pub mod cli;
pub mod dereference;
pub mod error;
pub mod json_schema;
pub mod load;
pub mod logging;
pub mod matcher;
pub mod mime;
pub mod oas;
pub mod operation;
pub mod reducer;
pub mod refs;
pub mod runtime_config;
pub mod samples;
pub mod user;

pub use dereference::{DereferenceOptions, Dereferencer, LocalDereferencer};
pub use error::{OasError, Result};
pub use json_schema::{to_json_schema, JsonSchemaOptions, RepairMode};
pub use matcher::{MatchedRoute, OperationMatch, PathMatch};
pub use oas::{DereferenceState, Oas};
pub use operation::Operation;
pub use reducer::{reduce, PathFilter, ReduceOptions};
