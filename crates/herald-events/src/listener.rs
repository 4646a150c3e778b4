//! Listener records, subscriber trait and registration handles.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use crate::error::ListenerResult;
use crate::event::{Event, EventName};

/// Label used for listeners registered without one.
pub const ANONYMOUS_LISTENER: &str = "anonymous";

type Callback = Arc<dyn Fn(&EventName, &Event) -> ListenerResult + Send + Sync>;

/// Trait for struct-shaped consumers.
///
/// Implement this when a consumer keeps its own state and wants a name in
/// fault reports. Closures cover the simple cases; see [`Listener::new`].
pub trait EventSubscriber: Send + Sync {
    /// Called with every event published on the channel this subscriber
    /// is registered on.
    ///
    /// Runs on the publisher's thread. A consumer that must not stall the
    /// publisher should enqueue the event and return.
    ///
    /// # Errors
    ///
    /// Any error is reported to the registry's fault reporter and does not
    /// reach the publisher.
    fn on_event(&self, name: &EventName, event: &Event) -> ListenerResult;

    /// Name shown in logs and fault reports.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        ANONYMOUS_LISTENER
    }
}

/// Identity token of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Whether a listener survives its first invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListenerMode {
    /// Invoked for every publish until unsubscribed.
    #[default]
    Persistent,
    /// Removed from its channel before its first invocation.
    Once,
}

/// A callback plus its delivery mode, ready to be registered.
///
/// ```rust
/// use herald_events::{EventRegistry, Listener};
///
/// let registry = EventRegistry::new();
/// let handle = registry.register(
///     "chain.new_block",
///     Listener::new(|event| println!("{event:?}")).with_label("printer").once(),
/// );
/// assert_eq!(handle.event_name().as_str(), "chain.new_block");
/// ```
pub struct Listener {
    id: ListenerId,
    label: String,
    mode: ListenerMode,
    callback: Callback,
    active: AtomicBool,
}

impl Listener {
    /// Listener from an infallible callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self::from_callback(Arc::new(move |_: &EventName, event: &Event| {
            callback(event);
            Ok(())
        }))
    }

    /// Listener from a callback that can fail.
    pub fn fallible<F>(callback: F) -> Self
    where
        F: Fn(&Event) -> ListenerResult + Send + Sync + 'static,
    {
        Self::from_callback(Arc::new(move |_: &EventName, event: &Event| callback(event)))
    }

    /// Listener that forwards to an [`EventSubscriber`].
    pub fn from_subscriber(subscriber: Arc<dyn EventSubscriber>) -> Self {
        let label = subscriber.name().to_owned();
        Self::from_callback(Arc::new(move |name: &EventName, event: &Event| {
            subscriber.on_event(name, event)
        }))
        .with_label(label)
    }

    fn from_callback(callback: Callback) -> Self {
        Self {
            id: ListenerId::new(),
            label: ANONYMOUS_LISTENER.to_owned(),
            mode: ListenerMode::Persistent,
            callback,
            active: AtomicBool::new(true),
        }
    }

    /// Mark this listener as once-only.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.mode = ListenerMode::Once;
        self
    }

    /// Set the name shown in logs and fault reports.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Identity token.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Name shown in logs and fault reports.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Delivery mode.
    #[must_use]
    pub fn mode(&self) -> ListenerMode {
        self.mode
    }

    pub(crate) fn is_once(&self) -> bool {
        self.mode == ListenerMode::Once
    }

    /// Whether the listener is still Active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Move to Removed. Returns `true` only for the caller that made the
    /// transition.
    pub(crate) fn retire(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn invoke(&self, name: &EventName, event: &Event) -> ListenerResult {
        (self.callback)(name, event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("mode", &self.mode)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Handle returned by every registration, used only to unsubscribe.
///
/// The handle does not keep the listener alive; the registry owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    event_name: EventName,
    id: ListenerId,
}

impl ListenerHandle {
    pub(crate) fn new(event_name: EventName, id: ListenerId) -> Self {
        Self { event_name, id }
    }

    /// Channel the listener was registered on.
    #[must_use]
    pub fn event_name(&self) -> &EventName {
        &self.event_name
    }

    /// Identity of the listener.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }
}
