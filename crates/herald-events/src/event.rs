//! Event names and opaque event payloads.

use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ListenerError;

/// Key identifying a logical notification channel.
///
/// Names are a convention shared by producers and consumers; the registry
/// never validates them. Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventName(Arc<str>);

impl EventName {
    /// Create an event name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EventName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EventName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&EventName> for EventName {
    fn from(name: &EventName) -> Self {
        name.clone()
    }
}

impl Serialize for EventName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EventName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Opaque value carried from a producer to every listener of a channel.
///
/// The registry never inspects the payload. Consumers narrow it back to
/// the type their channel convention promises with [`Event::downcast_ref`]
/// or [`Event::payload`].
#[derive(Clone)]
pub struct Event {
    payload: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Event {
    /// Wrap a value as an event payload.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            payload: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The conventional payload-less event.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(())
    }

    /// Whether this is the payload-less event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is::<()>()
    }

    /// Whether the payload is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Borrow the payload as a `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Borrow the payload as a `T`, or fail with a typed listener error.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::UnexpectedPayload`] when the payload is
    /// some other type.
    pub fn payload<T: Any>(&self) -> Result<&T, ListenerError> {
        self.downcast_ref::<T>()
            .ok_or(ListenerError::UnexpectedPayload {
                expected: std::any::type_name::<T>(),
                found: self.type_name,
            })
    }

    /// Rust type name of the payload, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_event_name_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(EventName::from("chain.new_block"), 1);

        assert_eq!(map.get("chain.new_block"), Some(&1));
        assert_eq!(map.get("chain.new_transaction"), None);
    }

    #[test]
    fn test_event_name_display_and_serde() {
        let name = EventName::new("tx");
        assert_eq!(name.to_string(), "tx");
        assert_eq!(format!("{name:?}"), "\"tx\"");

        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"tx\"");
        let parsed: EventName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_event_downcast() {
        let event = Event::new(42_u64);
        assert!(event.is::<u64>());
        assert_eq!(event.downcast_ref::<u64>(), Some(&42));
        assert!(event.downcast_ref::<String>().is_none());
        assert_eq!(event.type_name(), "u64");
    }

    #[test]
    fn test_event_payload_mismatch() {
        let event = Event::new("hello".to_string());
        let err = event.payload::<u64>().unwrap_err();
        assert!(matches!(
            err,
            ListenerError::UnexpectedPayload {
                expected: "u64",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_event() {
        let event = Event::empty();
        assert!(event.is_empty());
        assert!(!Event::new(1_u8).is_empty());
        assert!(Event::default().is_empty());
    }

    #[test]
    fn test_event_clone_shares_payload() {
        let event = Event::new(vec![1, 2, 3]);
        let cloned = event.clone();
        let a = event.downcast_ref::<Vec<i32>>().unwrap();
        let b = cloned.downcast_ref::<Vec<i32>>().unwrap();
        assert!(std::ptr::eq(a, b));
    }
}
