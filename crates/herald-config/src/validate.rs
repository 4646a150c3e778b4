//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Largest accepted channel receiver capacity.
pub const MAX_CHANNEL_CAPACITY: usize = 1_048_576;

/// Accepted `logging.level` values.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Accepted `logging.format` values.
pub const VALID_LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_events(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_events(config: &Config) -> ConfigResult<()> {
    let capacity = config.events.channel_capacity;
    if capacity == 0 || capacity > MAX_CHANNEL_CAPACITY {
        return Err(ConfigError::ValidationError {
            field: "events.channel_capacity".to_owned(),
            message: format!("channel_capacity must be between 1 and {MAX_CHANNEL_CAPACITY}"),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    if !VALID_LOG_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                VALID_LOG_LEVELS.join(", ")
            ),
        });
    }

    if !VALID_LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                VALID_LOG_FORMATS.join(", ")
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = Config::default();
        config.events.channel_capacity = 0;
        assert_eq!(field_of(validate(&config)), "events.channel_capacity");
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let mut config = Config::default();
        config.events.channel_capacity = MAX_CHANNEL_CAPACITY.saturating_add(1);
        assert_eq!(field_of(validate(&config)), "events.channel_capacity");
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }
}
