#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for the Herald runtime.
//!
//! # Usage
//!
//! ```rust,no_run
//! use herald_config::Config;
//!
//! // Defaults → optional file → HERALD_* env fallbacks → validate.
//! let resolved = Config::load(Some(std::path::Path::new("herald.toml"))).unwrap();
//! let config = resolved.config;
//! println!("channel capacity: {}", config.events.channel_capacity);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Config file** passed to [`Config::load`]
//! 2. **Environment variables** (`HERALD_*`), fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal herald crates**.
//! Conversion into domain types happens in the consuming crate behind its
//! `config` feature.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Layered merging with source tracking.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

// Re-export primary types at the crate root.
pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use merge::ConfigLayer;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config file is malformed or the final
    /// configuration fails validation.
    pub fn load(config_path: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(config_path)
    }

    /// Parse a configuration from a TOML string, merged over the embedded
    /// defaults and subject to the same size limit as a config file.
    ///
    /// Environment variables are not consulted.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the string is too large, not valid TOML,
    /// or the result fails validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::load_str(content)
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::ValidationError`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError {
            field: "<root>".to_owned(),
            message: e.to_string(),
        })
    }
}
