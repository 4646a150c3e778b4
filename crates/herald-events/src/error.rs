//! Error types for listeners and registry operations.

use thiserror::Error;

use crate::event::EventName;

/// Error a listener callback can return from a fallible handler.
///
/// Listener errors never reach the publisher. The registry hands them to
/// its [`FaultReporter`](crate::FaultReporter) and keeps delivering.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Free-form failure description.
    #[error("{0}")]
    Message(String),

    /// The event payload was not the type the listener expected.
    #[error("unexpected event payload: expected `{expected}`, found `{found}`")]
    UnexpectedPayload {
        /// Type the listener asked for.
        expected: &'static str,
        /// Type the producer actually published.
        found: &'static str,
    },

    /// A channel receiver's queue was full and the event was dropped.
    #[error("receiver queue for '{0}' is full, event dropped")]
    ChannelFull(EventName),

    /// A channel receiver was dropped before it could be unsubscribed.
    #[error("receiver for '{0}' is closed")]
    ReceiverClosed(EventName),

    /// Any other error raised by consumer code.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ListenerError {
    /// Create a free-form listener error.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Result type returned by fallible listener callbacks.
pub type ListenerResult = Result<(), ListenerError>;

/// Errors raised by registry operations that depend on the environment.
#[derive(Debug, Error)]
pub enum EventsError {
    /// A detached publish was requested outside a tokio runtime.
    #[error("no tokio runtime available for detached delivery")]
    NoRuntime,
}

/// Result type for registry operations.
pub type EventsResult<T> = Result<T, EventsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_error_display() {
        let err = ListenerError::msg("disk full");
        assert_eq!(err.to_string(), "disk full");

        let err = ListenerError::UnexpectedPayload {
            expected: "u64",
            found: "alloc::string::String",
        };
        assert!(err.to_string().contains("expected `u64`"));

        let err = ListenerError::ChannelFull(EventName::from("chain.new_block"));
        assert_eq!(
            err.to_string(),
            "receiver queue for 'chain.new_block' is full, event dropped"
        );
    }

    #[test]
    fn test_listener_error_from_boxed() {
        let io = std::io::Error::other("socket reset");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(io);
        let err = ListenerError::from(boxed);
        assert_eq!(err.to_string(), "socket reset");
    }
}
