//! Config file loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the user config file, if one was given and exists
//! 3. Apply `HERALD_*` env var fallbacks for fields the file did not set
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Config files larger than this are rejected.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// A loaded configuration together with where each field came from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Files that contributed, in merge order.
    pub loaded_files: Vec<String>,
    /// Source layer of every leaf field.
    pub field_sources: FieldSources,
}

/// Load configuration from defaults, an optional file and the process
/// environment.
///
/// A missing file is skipped; an unreadable or malformed one is an error.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is malformed, an env var cannot be
/// coerced, or the final configuration fails validation.
pub fn load(config_path: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with_env(config_path, &collect_env_vars())
}

/// Same as [`load`] with an explicit environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    config_path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Parse embedded defaults.
    let mut merged = parse_defaults()?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    // 2. User config file.
    if let Some(path) = config_path
        && let Some(overlay) = try_load_file(path)?
    {
        let loaded = path.display().to_string();
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::File(loaded.clone()),
            &mut field_sources,
        );
        info!(path = %loaded, "loaded config file");
        loaded_files.push(loaded);
    }

    // 3. Env var fallbacks.
    let applied = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars)?;
    if applied > 0 {
        debug!(count = applied, "applied env var fallbacks");
    }

    // 4. Deserialize and validate.
    let config = finish(merged)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
        field_sources,
    })
}

/// Read and parse a config file that must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, too large, or not
/// valid TOML.
pub fn load_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_source(&path.display().to_string(), &content)
}

/// Read and parse a config file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    parse_source(&path.display().to_string(), &content).map(Some)
}

/// Parse an in-memory TOML document over the embedded defaults.
///
/// Same size limit, merge and validation as a config file; environment
/// variables are not consulted.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the document is too large, not valid TOML,
/// or fails validation.
pub fn load_str(content: &str) -> ConfigResult<Config> {
    let overlay = parse_source("<string>", content)?;
    let mut merged = parse_defaults()?;
    let mut sources = FieldSources::new();
    deep_merge_tracking(
        &mut merged,
        &overlay,
        "",
        &ConfigLayer::File("<string>".to_owned()),
        &mut sources,
    );
    finish(merged)
}

fn parse_defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn finish(merged: toml::Value) -> ConfigResult<Config> {
    let config = merged.try_into::<Config>().map_err(|e| ConfigError::ParseError {
        path: "<merged config>".to_owned(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

fn parse_source(origin: &str, content: &str) -> ConfigResult<toml::Value> {
    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: origin.to_owned(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })
}
