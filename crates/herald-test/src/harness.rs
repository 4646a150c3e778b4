//! Test harness helpers.

use std::io::Write;

use tempfile::{NamedTempFile, TempDir};
use tracing_subscriber::EnvFilter;

use herald_events::{EventRegistry, RegistryOptions};

use crate::recorder::FaultCollector;

/// Create a temporary directory for testing.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Create a temporary `.toml` file with the given content.
///
/// # Panics
///
/// Panics if the file cannot be created or written.
#[must_use]
pub fn test_config_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// Create a registry whose faults go to a fresh [`FaultCollector`].
#[must_use]
pub fn test_registry() -> (EventRegistry, FaultCollector) {
    test_registry_with_options(RegistryOptions::default())
}

/// Like [`test_registry`], with explicit options.
#[must_use]
pub fn test_registry_with_options(options: RegistryOptions) -> (EventRegistry, FaultCollector) {
    let collector = FaultCollector::new();
    let registry = EventRegistry::from_parts(options, std::sync::Arc::new(collector.clone()));
    (registry, collector)
}

/// Set up test logging with the given filter.
///
/// Safe to call from every test; only the first call installs a
/// subscriber.
///
/// # Example
///
/// ```rust,ignore
/// use herald_test::setup_test_logging;
///
/// #[test]
/// fn my_test() {
///     setup_test_logging("herald_events=trace");
///     // ... test code
/// }
/// ```
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging with default filter (warn level).
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_has_toml_suffix() {
        let file = test_config_file("[events]\nchannel_capacity = 8\n");
        assert_eq!(
            file.path().extension().and_then(|e| e.to_str()),
            Some("toml")
        );
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("channel_capacity = 8"));
    }

    #[test]
    fn test_registry_routes_faults_to_collector() {
        setup_test_logging_default();
        let (registry, faults) = test_registry();
        registry.subscribe_fallible("x", |_| Err(herald_events::ListenerError::msg("bad")));

        registry.publish("x", herald_events::Event::empty());
        assert_eq!(faults.len(), 1);
    }
}
