//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields that
//! no config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

/// Kind of TOML value an env var is coerced to.
#[derive(Debug, Clone, Copy)]
enum FieldKind {
    String,
    Integer,
}

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

/// All supported `HERALD_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "HERALD_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "HERALD_LOG_FORMAT",
        field_path: "logging.format",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "HERALD_EVENTS_CHANNEL_CAPACITY",
        field_path: "events.channel_capacity",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "HERALD_EVENTS_SLOW_LISTENER_THRESHOLD_MS",
        field_path: "events.slow_listener_threshold_ms",
        kind: FieldKind::Integer,
    },
];

/// Apply env var fallbacks to fields that no file layer set.
///
/// Returns the number of fields filled from the environment.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric variable does not parse.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = matches!(sources.get(mapping.field_path), Some(ConfigLayer::File(_)));
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            let value = coerce(mapping, val)?;
            set_field(merged, mapping.field_path, value);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, val: &str) -> ConfigResult<toml::Value> {
    match mapping.kind {
        FieldKind::String => Ok(toml::Value::String(val.trim().to_owned())),
        FieldKind::Integer => val
            .trim()
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|e| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected an integer for {}: {e}", mapping.field_path),
            }),
    }
}

/// Set a dotted-path field, creating intermediate tables as needed.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut current = root;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };

        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }

        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

/// Snapshot of the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
