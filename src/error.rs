//! Error type shared across the crate.
//!
//! Lookups that may legitimately find nothing (operations, routes, media types)
//! return `Option`. `OasError` is reserved for requests that provably cannot be
//! satisfied: a `$ref` pointing nowhere, a document without a version, a
//! reduction that leaves nothing behind.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the query and normalization APIs.
#[derive(Debug, Error)]
pub enum OasError {
    /// A `$ref` could not be resolved against `components.schemas`.
    ///
    /// The message names the pointer that was attempted.
    #[error("Could not find a definition for {0}.")]
    ReferenceNotFound(String),

    /// Neither `openapi` nor `swagger` is present on the definition.
    #[error("Unable to recognize what specification version this API definition conforms to.")]
    UnrecognizedVersion,

    /// The reducer only understands OpenAPI 3.x documents.
    #[error("Sorry, only OpenAPI 3.x definitions are supported.")]
    UnsupportedVersion,

    /// A reduction matched no paths at all.
    #[error("All paths in the API definition were removed. Did you supply the right path name to reduce by?")]
    AllPathsRemoved,

    /// A [`Dereferencer`](crate::dereference::Dereferencer) gave up.
    #[error("Unable to dereference the API definition: {0}")]
    Dereference(String),

    /// The normalizer was asked to repair a schema while running in strict mode.
    #[error("Schema at `{location}` requires repair: {reason}")]
    Strict {
        /// JSON pointer of the offending node
        location: String,
        /// What would have been repaired in lenient mode
        reason: String,
    },

    /// Reading or parsing a definition file failed.
    #[error("Failed to load API definition from {}: {message}", path.display())]
    Load {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O or parse failure
        message: String,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, OasError>;
