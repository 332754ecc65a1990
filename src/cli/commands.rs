use crate::{
    json_schema::RepairMode,
    load::load_definition,
    operation::{ParameterSchemaOptions, ResponseSchemaOptions},
    reducer::{reduce, PathFilter, ReduceOptions},
    runtime_config::RuntimeConfig,
    DereferenceOptions, Oas,
};
use anyhow::{anyhow, bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for openapi-query
///
/// Loads an OpenAPI definition and answers questions about it.
#[derive(Parser)]
#[command(name = "oas-query")]
#[command(about = "Query and normalize OpenAPI definitions", long_about = None, version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// User context as JSON, used for server variables and credentials
    #[arg(long, env = "OAS_USER", global = true)]
    pub user: Option<String>,

    /// Fail instead of repairing malformed schemas
    #[arg(long, default_value_t = false, global = true)]
    pub strict: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the version, resolved servers and every operation
    Inspect {
        /// Path to the OpenAPI definition (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },
    /// Match a concrete URL to the path template that declares it
    Find {
        #[arg(short, long)]
        spec: PathBuf,

        /// Full request URL, e.g. https://petstore.swagger.io/v2/pet/1
        #[arg(short, long)]
        url: String,

        /// HTTP method; omit to match on the URL alone
        #[arg(short, long)]
        method: Option<String>,
    },
    /// Print an operation's parameters (or one response) as JSON Schema
    Schema {
        #[arg(short, long)]
        spec: PathBuf,

        /// Path template as declared, e.g. /pet/{petId}
        #[arg(short, long)]
        path: String,

        #[arg(short, long)]
        method: String,

        /// Describe this response status instead of the request
        #[arg(long)]
        status: Option<String>,

        /// Fold non-body parameters into a single metadata group
        #[arg(long, default_value_t = false)]
        merge: bool,
    },
    /// Keep only the operations matching the given tags and paths
    Reduce {
        #[arg(short, long)]
        spec: PathBuf,

        /// Tag to keep (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Path to keep, as `/path` or `/path=get,post` (repeatable)
        #[arg(short, long = "path")]
        paths: Vec<String>,
    },
}

/// Parse `/pets=get,post`, `/pets=*` or a bare `/pets`.
pub(super) fn parse_path_filter(raw: &str) -> anyhow::Result<(String, PathFilter)> {
    let (path, methods) = match raw.split_once('=') {
        Some((path, methods)) => (path, Some(methods)),
        None => (raw, None),
    };
    if path.is_empty() {
        bail!("Empty path in `{raw}`");
    }
    let filter = match methods.map(str::trim) {
        None | Some("*") => PathFilter::All,
        Some(methods) => PathFilter::Methods(
            methods
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_ascii_lowercase)
                .collect(),
        ),
    };
    Ok((path.to_string(), filter))
}

impl Cli {
    fn user_context(&self) -> anyhow::Result<Value> {
        match &self.user {
            Some(raw) => serde_json::from_str(raw).context("--user must be valid JSON"),
            None => Ok(json!({})),
        }
    }

    fn runtime_config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::from_env();
        if self.strict {
            config.repair_mode = RepairMode::Strict;
        }
        config
    }

    async fn open(&self, spec: &Path) -> anyhow::Result<Oas> {
        let definition = load_definition(spec)?;
        let oas = Oas::with_config(definition, self.user_context()?, self.runtime_config());
        oas.dereference(DereferenceOptions::default())
            .await
            .with_context(|| format!("Failed to dereference {}", spec.display()))?;
        Ok(oas)
    }
}

/// Execute the command and return what it would print.
///
/// # Errors
///
/// Returns an error if:
/// - The definition cannot be loaded, parsed or dereferenced
/// - `--user` is not JSON
/// - A URL or operation does not match anything
/// - Reduction leaves nothing behind
pub async fn execute(cli: &Cli) -> anyhow::Result<Value> {
    match &cli.command {
        Commands::Inspect { spec } => {
            let oas = cli.open(spec).await?;
            let servers = oas
                .definition()
                .get("servers")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            let urls: Vec<String> = (0..servers.max(1))
                .map(|selected| oas.url(selected, None))
                .collect();
            let operations: Vec<Value> = oas
                .paths()
                .values()
                .flat_map(|methods| methods.values())
                .map(|operation| {
                    let tags: Vec<Value> = operation
                        .tags()
                        .iter()
                        .filter_map(|t| t.get("name").cloned())
                        .collect();
                    json!({
                        "method": operation.method().to_uppercase(),
                        "path": operation.path(),
                        "operationId": operation.operation_id(true),
                        "summary": operation.summary(),
                        "tags": tags,
                        "deprecated": operation.is_deprecated(),
                    })
                })
                .collect();
            info!(operations = operations.len(), "inspected definition");
            Ok(json!({
                "version": oas.version()?,
                "servers": urls,
                "tags": oas.tags(true),
                "operations": operations,
            }))
        }
        Commands::Find { spec, url, method } => {
            let oas = cli.open(spec).await?;
            let found = match method {
                Some(method) => serde_json::to_value(
                    oas.find_operation(url, method)
                        .ok_or_else(|| {
                            anyhow!("No operation matches {} {url}", method.to_uppercase())
                        })?
                        .url,
                )?,
                None => serde_json::to_value(
                    oas.find_operation_without_method(url)
                        .ok_or_else(|| anyhow!("No path matches {url}"))?
                        .url,
                )?,
            };
            Ok(found)
        }
        Commands::Schema {
            spec,
            path,
            method,
            status,
            merge,
        } => {
            let oas = cli.open(spec).await?;
            let declared = oas
                .definition()
                .get("paths")
                .and_then(|paths| paths.get(path))
                .and_then(|item| item.get(method.to_ascii_lowercase()))
                .is_some();
            if !declared {
                bail!("{} {path} is not declared", method.to_uppercase());
            }
            let operation = oas.operation(path, method);
            let out = match status {
                Some(status) => {
                    let options = ResponseSchemaOptions::default();
                    serde_json::to_value(operation.response_as_json_schema(status, &options)?)?
                }
                None => {
                    let options = ParameterSchemaOptions {
                        merge_into_body_and_metadata: *merge,
                        ..Default::default()
                    };
                    serde_json::to_value(operation.parameters_as_json_schema(&options)?)?
                }
            };
            Ok(out)
        }
        Commands::Reduce { spec, tags, paths } => {
            let definition = load_definition(spec)?;
            let paths: IndexMap<String, PathFilter> =
                paths.iter().map(|raw| parse_path_filter(raw)).collect::<anyhow::Result<_>>()?;
            let options = ReduceOptions {
                tags: tags.clone(),
                paths,
            };
            Ok(reduce(&definition, &options)?)
        }
    }
}

/// Parse arguments, run the command and print its result as JSON on stdout.
///
/// # Errors
///
/// See [`execute`].
pub async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let out = execute(&cli).await?;
    let rendered = match out {
        Value::Null => String::from("null"),
        other => serde_json::to_string_pretty(&other)?,
    };
    println!("{rendered}");
    Ok(())
}
