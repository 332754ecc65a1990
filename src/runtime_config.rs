//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for an [`Oas`](crate::Oas) session.
//!
//! ## Environment Variables
//!
//! ### `OAS_SAMPLE_CACHE_SIZE`
//!
//! Number of generated examples kept in the per-session LRU cache.
//! `0` disables caching entirely.
//!
//! Default: `256`
//!
//! The cache is owned by one `Oas` and dropped with it.
//!
//! ### `OAS_STRICT_SCHEMAS`
//!
//! When `true`, schema conversion reports the first repair it would have made
//! (an unmergeable `allOf`, an array typed as object, ...) as an error instead
//! of silently fixing it.
//!
//! Default: `false`
//!
//! ## Usage
//!
//! ```rust
//! use openapi_query::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Example cache: {} entries", config.sample_cache_size);
//! ```
//!
//! ## Example Configuration
//!
//! ```bash
//! export OAS_SAMPLE_CACHE_SIZE=1024
//! export OAS_STRICT_SCHEMAS=true
//! oas-query schema --spec petstore.yaml --path /pet --method post
//! ```

use std::env;

use crate::json_schema::RepairMode;

/// Default capacity of the example cache.
pub const DEFAULT_SAMPLE_CACHE_SIZE: usize = 256;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of the example cache (default: 256, 0 disables)
    pub sample_cache_size: usize,
    /// How the schema normalizer treats malformed input (default: lenient)
    pub repair_mode: RepairMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sample_cache_size: DEFAULT_SAMPLE_CACHE_SIZE,
            repair_mode: RepairMode::Lenient,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sample_cache_size = lookup("OAS_SAMPLE_CACHE_SIZE")
            .and_then(|val| val.trim().parse().ok())
            .unwrap_or(DEFAULT_SAMPLE_CACHE_SIZE);
        let strict = lookup("OAS_STRICT_SCHEMAS")
            .is_some_and(|val| matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes"));
        RuntimeConfig {
            sample_cache_size,
            repair_mode: if strict {
                RepairMode::Strict
            } else {
                RepairMode::Lenient
            },
        }
    }
}
