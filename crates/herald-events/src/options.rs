//! Registry tuning knobs.

use std::time::Duration;

/// Default bounded-queue size for channel receivers.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Options fixed at registry construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Queue size for receivers created by `subscribe_channel`.
    pub channel_capacity: usize,
    /// Callbacks running longer than this are logged at warn level.
    /// `None` disables the check.
    pub slow_listener_threshold: Option<Duration>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            slow_listener_threshold: None,
        }
    }
}

impl RegistryOptions {
    /// Set the channel receiver capacity. Zero is raised to one.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Warn about callbacks slower than `threshold`.
    #[must_use]
    pub fn with_slow_listener_threshold(mut self, threshold: Duration) -> Self {
        self.slow_listener_threshold = Some(threshold);
        self
    }
}

#[cfg(feature = "config")]
impl From<&herald_config::EventsSection> for RegistryOptions {
    fn from(section: &herald_config::EventsSection) -> Self {
        let threshold = (section.slow_listener_threshold_ms > 0)
            .then(|| Duration::from_millis(section.slow_listener_threshold_ms));
        Self {
            channel_capacity: section.channel_capacity.max(1),
            slow_listener_threshold: threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RegistryOptions::default();
        assert_eq!(options.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(options.slow_listener_threshold.is_none());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let options = RegistryOptions::default().with_channel_capacity(0);
        assert_eq!(options.channel_capacity, 1);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_events_section() {
        let section = herald_config::EventsSection {
            channel_capacity: 16,
            slow_listener_threshold_ms: 250,
        };
        let options = RegistryOptions::from(&section);
        assert_eq!(options.channel_capacity, 16);
        assert_eq!(
            options.slow_listener_threshold,
            Some(Duration::from_millis(250))
        );

        let section = herald_config::EventsSection {
            channel_capacity: 16,
            slow_listener_threshold_ms: 0,
        };
        assert!(RegistryOptions::from(&section).slow_listener_threshold.is_none());
    }
}
