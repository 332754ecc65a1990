//! # Definition Wrapper
//!
//! [`Oas`] owns one API definition plus the caller's user context and hands
//! out [`Operation`] views over it.
//!
//! ## Dereferencing
//!
//! The definition is held behind an [`ArcSwap`]. [`Oas::dereference`] runs
//! the configured [`Dereferencer`] at most once per session:
//!
//! ```text
//! NotStarted --dereference()--> Processing --ok--> Complete
//!                                   |
//!                                   +--err--> NotStarted
//! ```
//!
//! Callers that arrive while a pass is in flight wait on that same pass.
//! Only the definition is handed to the dereferencer; the user context stays
//! in its own field and is never part of the document being rewritten.
//!
//! ## Example
//!
//! ```rust,no_run
//! use openapi_query::{DereferenceOptions, Oas};
//! use serde_json::json;
//!
//! # async fn demo() -> openapi_query::Result<()> {
//! let oas = Oas::new(json!({"openapi": "3.0.3", "paths": {}}), json!({}));
//! oas.dereference(DereferenceOptions::default()).await?;
//! assert_eq!(oas.version()?, "3.0.3");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::auth;
use crate::dereference::{
    tag_component_schemas, DereferenceOptions, Dereferencer, LocalDereferencer,
};
use crate::error::{OasError, Result};
use crate::matcher::{self, OperationMatch, PathMatch, ServerSelection, UrlChunk};
use crate::operation::{is_method, Operation};
use crate::refs::resolve_pointer;
use crate::runtime_config::RuntimeConfig;
use crate::samples::ExampleCache;

/// Where a session is in its one-time dereference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DereferenceState {
    NotStarted,
    Processing,
    Complete,
}

impl DereferenceState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => DereferenceState::Processing,
            2 => DereferenceState::Complete,
            _ => DereferenceState::NotStarted,
        }
    }
}

/// Operations keyed by path (or webhook name), then by method.
pub type OperationMap = IndexMap<String, IndexMap<String, Operation>>;

/// An API definition and the user it is being rendered for.
pub struct Oas {
    definition: ArcSwap<Value>,
    user: Value,
    dereferenced: OnceCell<()>,
    state: AtomicU8,
    dereferencer: Arc<dyn Dereferencer>,
    samples: Arc<ExampleCache>,
    config: RuntimeConfig,
}

impl fmt::Debug for Oas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Oas")
            .field("state", &self.dereference_state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Oas {
    /// Wrap `definition` for `user` with default configuration.
    ///
    /// Neither value is validated; `null` and `{}` are both accepted.
    #[must_use]
    pub fn new(definition: Value, user: Value) -> Self {
        Self::with_config(definition, user, RuntimeConfig::default())
    }

    #[must_use]
    pub fn with_config(definition: Value, user: Value, config: RuntimeConfig) -> Self {
        Self {
            definition: ArcSwap::from_pointee(definition),
            user,
            dereferenced: OnceCell::new(),
            state: AtomicU8::new(DereferenceState::NotStarted as u8),
            dereferencer: Arc::new(LocalDereferencer),
            samples: Arc::new(ExampleCache::new(config.sample_cache_size)),
            config,
        }
    }

    /// Replace the built-in [`LocalDereferencer`].
    #[must_use]
    pub fn with_dereferencer(mut self, dereferencer: Arc<dyn Dereferencer>) -> Self {
        self.dereferencer = dereferencer;
        self
    }

    /// Snapshot of the current definition.
    #[must_use]
    pub fn definition(&self) -> Arc<Value> {
        self.definition.load_full()
    }

    #[must_use]
    pub fn user(&self) -> &Value {
        &self.user
    }

    #[must_use]
    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    #[must_use]
    pub fn dereference_state(&self) -> DereferenceState {
        DereferenceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Inline every `$ref` the dereferencer can resolve.
    ///
    /// Component schemas are tagged with their name first (see
    /// [`DereferenceOptions`]). Concurrent callers share one pass; once it
    /// succeeds, later calls return immediately. A failed pass can be retried.
    ///
    /// # Errors
    ///
    /// Whatever the dereferencer reports.
    pub async fn dereference(&self, options: DereferenceOptions) -> Result<()> {
        self.dereferenced
            .get_or_try_init(|| async {
                self.state.store(DereferenceState::Processing as u8, Ordering::Release);
                let mut working = (**self.definition.load()).clone();
                tag_component_schemas(&mut working, &options);

                match self.dereferencer.dereference(working).await {
                    Ok(resolved) => {
                        self.definition.store(Arc::new(resolved));
                        self.state.store(DereferenceState::Complete as u8, Ordering::Release);
                        info!("definition dereferenced");
                        Ok(())
                    }
                    Err(err) => {
                        self.state.store(DereferenceState::NotStarted as u8, Ordering::Release);
                        warn!(error = %err, "dereferencing failed");
                        Err(err)
                    }
                }
            })
            .await
            .map(|_| ())
    }

    /// The `openapi` (or `swagger`) version string.
    ///
    /// # Errors
    ///
    /// [`OasError::UnrecognizedVersion`] when neither is present.
    pub fn version(&self) -> Result<String> {
        let definition = self.definition();
        ["openapi", "swagger"]
            .iter()
            .find_map(|key| definition.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or(OasError::UnrecognizedVersion)
    }

    /// Base URL of `servers[selected]` with variables filled in.
    ///
    /// `variables` replaces the declared defaults; user values win over both.
    #[must_use]
    pub fn url(&self, selected: usize, variables: Option<&Map<String, Value>>) -> String {
        let definition = self.definition();
        let base = matcher::normalized_url(&definition, selected);
        let values = match variables {
            Some(variables) => variables.clone(),
            None => self.default_variables(selected),
        };
        matcher::replace_url(&base, &Value::Object(values), &self.user)
            .trim()
            .to_string()
    }

    #[must_use]
    pub fn replace_url(&self, url: &str, variables: &Value) -> String {
        matcher::replace_url(url, variables, &self.user)
    }

    #[must_use]
    pub fn split_url(&self, selected: usize) -> Vec<UrlChunk> {
        matcher::split_url(&self.definition(), selected)
    }

    /// Which server `base_url` belongs to and the variable values it implies.
    #[must_use]
    pub fn split_variables(&self, base_url: &str) -> Option<ServerSelection> {
        matcher::split_variables(&self.definition(), base_url)
    }

    /// Declared variables of `servers[selected]`.
    #[must_use]
    pub fn variables(&self, selected: usize) -> Map<String, Value> {
        matcher::server_variables(&self.definition(), selected)
    }

    #[must_use]
    pub fn default_variables(&self, selected: usize) -> Map<String, Value> {
        matcher::default_variables(&self.definition(), &self.user, selected)
    }

    fn bind(&self, operation: Operation) -> Operation {
        operation.with_session(Arc::clone(&self.samples), self.config.repair_mode)
    }

    /// The operation at `path` + `method`; an empty one when undeclared.
    #[must_use]
    pub fn operation(&self, path: &str, method: &str) -> Operation {
        self.bind(Operation::lookup(self.definition(), path, method))
    }

    #[must_use]
    pub fn find_operation(&self, url: &str, method: &str) -> Option<OperationMatch> {
        matcher::find_operation(&self.definition(), &self.user, url, method)
    }

    #[must_use]
    pub fn find_operation_without_method(&self, url: &str) -> Option<PathMatch> {
        matcher::find_operation_without_method(&self.definition(), &self.user, url)
    }

    /// Match `url` + `method` and wrap the result as an [`Operation`].
    #[must_use]
    pub fn get_operation(&self, url: &str, method: &str) -> Option<Operation> {
        let found = self.find_operation(url, method)?;
        Some(self.operation(&found.url.non_normalized_path, method))
    }

    fn operations_in(
        &self,
        section: &str,
        path_item_of: impl Fn(&str, &Value) -> Option<Value>,
    ) -> OperationMap {
        let definition = self.definition();
        let Some(entries) = definition.get(section).and_then(Value::as_object) else {
            return IndexMap::new();
        };
        entries
            .iter()
            .filter(|(name, _)| !name.starts_with("x-"))
            .filter_map(|(name, raw)| {
                let path_item = path_item_of(name, raw)?;
                let operations: IndexMap<String, Operation> = path_item
                    .as_object()?
                    .iter()
                    .filter(|(method, _)| is_method(method))
                    .map(|(method, schema)| {
                        let operation = Operation::new(
                            Arc::clone(&definition),
                            name.as_str(),
                            method.as_str(),
                            schema.clone(),
                        )
                        .with_path_item(path_item.clone());
                        (method.clone(), self.bind(operation))
                    })
                    .collect();
                Some((name.clone(), operations))
            })
            .collect()
    }

    /// Every operation under `paths`. A `$ref`'d path item is followed.
    #[must_use]
    pub fn paths(&self) -> OperationMap {
        let definition = self.definition();
        self.operations_in("paths", |path, raw| match raw.get("$ref").and_then(Value::as_str) {
            Some(reference) => {
                let resolved = resolve_pointer(reference, &definition).cloned();
                if resolved.is_none() {
                    debug!(path = %path, reference = %reference, "path item $ref does not resolve");
                }
                resolved
            }
            None => Some(raw.clone()),
        })
    }

    /// Every operation under `webhooks` (OpenAPI 3.1), keyed by webhook name.
    #[must_use]
    pub fn webhooks(&self) -> OperationMap {
        self.operations_in("webhooks", |_, raw| Some(raw.clone()))
    }

    /// Tag names used by operations: tags declared at the root first (in
    /// root order), then any others in the order they are first seen.
    ///
    /// With `set_if_missing`, an untagged operation contributes its path.
    #[must_use]
    pub fn tags(&self, set_if_missing: bool) -> Vec<String> {
        let mut used: Vec<String> = Vec::new();
        for (path, operations) in self.paths() {
            for operation in operations.values() {
                let declared: Vec<String> = operation
                    .schema()
                    .get("tags")
                    .and_then(Value::as_array)
                    .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                if declared.is_empty() {
                    if set_if_missing && !used.contains(&path) {
                        used.push(path.clone());
                    }
                    continue;
                }
                for tag in declared {
                    if !used.contains(&tag) {
                        used.push(tag);
                    }
                }
            }
        }

        let definition = self.definition();
        let root: Vec<&str> = definition
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(|tag| tag.get("name")?.as_str()).collect())
            .unwrap_or_default();

        let mut ordered: Vec<String> = root
            .iter()
            .filter(|name| used.iter().any(|tag| tag == *name))
            .map(|name| (*name).to_string())
            .collect();
        ordered.extend(used.into_iter().filter(|tag| !root.contains(&tag.as_str())));
        ordered
    }

    #[must_use]
    pub fn has_extension(&self, extension: &str) -> bool {
        self.definition().get(extension).is_some()
    }

    #[must_use]
    pub fn extension(&self, extension: &str) -> Option<Value> {
        self.definition().get(extension).cloned()
    }

    /// Credentials for every declared security scheme, taken from the user.
    #[must_use]
    pub fn get_auth(&self, selected_app: Option<&str>) -> Map<String, Value> {
        auth::get_auth(&self.definition(), &self.user, selected_app)
    }
}
