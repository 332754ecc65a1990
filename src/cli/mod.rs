//! # CLI Module
//!
//! Command-line access to the query API, shipped as the `oas-query` binary.
//! Every command loads a definition, dereferences it, and prints JSON on
//! stdout. Logs go to stderr.
//!
//! ## Commands
//!
//! ### `inspect`
//!
//! Version, resolved server URLs, tags and every operation:
//!
//! ```bash
//! oas-query inspect --spec petstore.yaml
//! ```
//!
//! ### `find`
//!
//! Resolve a concrete URL (and optionally a method) to its path template
//! and captured slugs:
//!
//! ```bash
//! oas-query find --spec petstore.yaml --url https://petstore.swagger.io/v2/pet/1 --method delete
//! ```
//!
//! ### `schema`
//!
//! An operation's inputs, or one of its responses, as JSON Schema:
//!
//! ```bash
//! oas-query schema --spec petstore.yaml --path /pet --method post
//! oas-query schema --spec petstore.yaml --path /pet/{petId} --method get --status 200
//! ```
//!
//! ### `reduce`
//!
//! Shrink a definition to selected tags and paths:
//!
//! ```bash
//! oas-query reduce --spec petstore.yaml --tag store
//! oas-query reduce --spec petstore.yaml --path '/store/order/{orderId}=get'
//! ```
//!
//! ## Global options
//!
//! - `-v` / `-vv` - debug / trace logging (see [`crate::logging`])
//! - `--user <JSON>` (or `OAS_USER`) - user context for server variables and auth
//! - `--strict` - report schema repairs as errors

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{execute, run_cli, Cli, Commands};
