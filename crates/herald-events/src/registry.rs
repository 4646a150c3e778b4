//! The event registry: named channels of ordered listeners.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Instant;

use tracing::{debug, error, trace, warn};

use crate::event::{Event, EventName};
use crate::fault::{FaultKind, FaultReporter, ListenerFault, TracingFaultReporter, panic_message};
use crate::listener::{EventSubscriber, Listener, ListenerHandle};
use crate::options::RegistryOptions;

type Channels = HashMap<EventName, Vec<Arc<Listener>>>;

/// Outcome counts of one publish call.
///
/// Informational only: publishing never fails from the caller's side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Listeners that returned normally.
    pub delivered: usize,
    /// Listeners that returned an error or panicked.
    pub failed: usize,
}

impl DeliveryReport {
    /// Number of listeners invoked.
    #[must_use]
    pub fn total(&self) -> usize {
        self.delivered.saturating_add(self.failed)
    }

    /// Whether every invoked listener succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

pub(crate) struct RegistryInner {
    channels: RwLock<Channels>,
    reporter: Arc<dyn FaultReporter>,
    options: RegistryOptions,
}

impl RegistryInner {
    // Callbacks never run under this lock, so a poisoned guard still holds
    // a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, Channels> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Channels> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub(crate) fn insert(&self, name: EventName, listener: Listener) -> ListenerHandle {
        let handle = ListenerHandle::new(name.clone(), listener.id());

        debug!(
            event_name = %name,
            listener_id = %listener.id(),
            listener = %listener.label(),
            mode = ?listener.mode(),
            "Listener subscribed"
        );

        self.write().entry(name).or_default().push(Arc::new(listener));
        handle
    }

    pub(crate) fn remove(&self, handle: &ListenerHandle) -> bool {
        let removed = {
            let mut channels = self.write();
            let Some(listeners) = channels.get_mut(handle.event_name().as_str()) else {
                return false;
            };
            let position = listeners.iter().position(|l| l.id() == handle.id());
            let removed = position.map(|index| listeners.remove(index));
            if listeners.is_empty() {
                channels.remove(handle.event_name().as_str());
            }
            removed
        };

        // Dropped after the lock is released: a listener's captured state may
        // call back into the registry from its destructor.
        match removed {
            Some(listener) => {
                listener.retire();
                debug!(
                    event_name = %handle.event_name(),
                    listener_id = %handle.id(),
                    listener = %listener.label(),
                    "Listener unsubscribed"
                );
                true
            },
            None => {
                trace!(
                    event_name = %handle.event_name(),
                    listener_id = %handle.id(),
                    "Unsubscribe for absent listener ignored"
                );
                false
            },
        }
    }

    /// Listeners subscribed to `name` right now, in subscription order.
    ///
    /// Once listeners in the snapshot are removed from the channel and
    /// retired before this returns, so no later snapshot can contain them.
    pub(crate) fn snapshot(&self, name: &str) -> Option<(EventName, Vec<Arc<Listener>>)> {
        {
            let channels = self.read();
            let (key, listeners) = channels.get_key_value(name)?;
            if !listeners.iter().any(|l| l.is_once()) {
                return Some((key.clone(), listeners.clone()));
            }
        }

        let mut channels = self.write();
        let (key, listeners) = channels.get_key_value(name)?;
        let key = key.clone();
        let mut snapshot = listeners.clone();

        if let Some(listeners) = channels.get_mut(name) {
            listeners.retain(|l| !l.is_once());
            if listeners.is_empty() {
                channels.remove(name);
            }
        }
        drop(channels);

        // Only the caller that flips a once listener to Removed may deliver it.
        snapshot.retain(|listener| {
            if !listener.is_once() {
                return true;
            }
            let claimed = listener.retire();
            trace!(
                event_name = %key,
                listener_id = %listener.id(),
                claimed,
                "Once listener claimed"
            );
            claimed
        });

        Some((key, snapshot))
    }

    pub(crate) fn deliver(
        &self,
        name: &EventName,
        event: &Event,
        listeners: &[Arc<Listener>],
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for listener in listeners {
            trace!(
                event_name = %name,
                listener_id = %listener.id(),
                listener = %listener.label(),
                "Notifying listener"
            );

            let started = Instant::now();
            // Catch panics to prevent one listener from affecting others
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.invoke(name, event)));
            let elapsed = started.elapsed();

            if let Some(threshold) = self.options.slow_listener_threshold
                && elapsed > threshold
            {
                warn!(
                    event_name = %name,
                    listener_id = %listener.id(),
                    listener = %listener.label(),
                    elapsed_ms = elapsed.as_millis(),
                    threshold_ms = threshold.as_millis(),
                    "Slow listener stalled publisher"
                );
            }

            let fault = match outcome {
                Ok(Ok(())) => {
                    report.delivered = report.delivered.saturating_add(1);
                    continue;
                },
                Ok(Err(error)) => ListenerFault {
                    event_name: name.clone(),
                    listener_id: listener.id(),
                    label: listener.label().to_owned(),
                    kind: FaultKind::Failed(error),
                },
                Err(payload) => {
                    ListenerFault::panicked(name, listener.id(), listener.label(), &*payload)
                },
            };

            report.failed = report.failed.saturating_add(1);
            self.report(&fault);
        }

        report
    }

    /// Hand `fault` to the reporter. A panicking reporter is logged and
    /// delivery carries on.
    fn report(&self, fault: &ListenerFault) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.reporter.report(fault))) {
            error!(
                event_name = %fault.event_name,
                listener_id = %fault.listener_id,
                listener = %fault.label,
                panic = %panic_message(&*payload),
                "Fault reporter panicked"
            );
        }
    }
}

/// Registry mapping event names to ordered listener sequences.
///
/// Cloning is cheap and every clone refers to the same registry. Create
/// one per subsystem and hand clones to its producers and consumers; the
/// listeners are dropped together with the last clone.
///
/// **WARNING:** a listener that captures a clone of the registry it is
/// registered on forms an `Arc` cycle and is never dropped. Capture a
/// [`WeakEventRegistry`] from [`EventRegistry::downgrade`] instead.
///
/// ```rust
/// use herald_events::{Event, EventRegistry};
/// use std::sync::{Arc, Mutex};
///
/// let registry = EventRegistry::new();
/// let heights = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&heights);
/// registry.subscribe("block", move |event| {
///     if let Some(h) = event.downcast_ref::<u64>() {
///         sink.lock().unwrap().push(*h);
///     }
/// });
///
/// let report = registry.publish("block", Event::new(7_u64));
/// assert_eq!(report.delivered, 1);
/// assert_eq!(*heights.lock().unwrap(), vec![7]);
/// ```
#[derive(Clone)]
pub struct EventRegistry {
    pub(crate) inner: Arc<RegistryInner>,
}

impl EventRegistry {
    /// Create a registry with default options that logs faults via `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    /// Create a registry with the given options.
    #[must_use]
    pub fn with_options(options: RegistryOptions) -> Self {
        Self::from_parts(options, Arc::new(TracingFaultReporter))
    }

    /// Create a registry with default options and a custom fault reporter.
    #[must_use]
    pub fn with_fault_reporter(reporter: impl FaultReporter + 'static) -> Self {
        Self::from_parts(RegistryOptions::default(), Arc::new(reporter))
    }

    /// Create a registry from options and a shared fault reporter.
    #[must_use]
    pub fn from_parts(options: RegistryOptions, reporter: Arc<dyn FaultReporter>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                channels: RwLock::new(HashMap::new()),
                reporter,
                options,
            }),
        }
    }

    /// Options this registry was built with.
    #[must_use]
    pub fn options(&self) -> &RegistryOptions {
        self.inner.options()
    }

    /// Append a persistent listener to `name`.
    ///
    /// Registering the same callback twice yields two independent entries.
    pub fn subscribe<F>(&self, name: impl Into<EventName>, callback: F) -> ListenerHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(name, Listener::new(callback))
    }

    /// Append a listener to `name` that is removed before its first
    /// invocation.
    pub fn subscribe_once<F>(&self, name: impl Into<EventName>, callback: F) -> ListenerHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(name, Listener::new(callback).once())
    }

    /// Append a persistent listener whose failures are reported as faults.
    pub fn subscribe_fallible<F>(&self, name: impl Into<EventName>, callback: F) -> ListenerHandle
    where
        F: Fn(&Event) -> crate::ListenerResult + Send + Sync + 'static,
    {
        self.register(name, Listener::fallible(callback))
    }

    /// Append a prepared [`Listener`] to `name`.
    pub fn register(&self, name: impl Into<EventName>, listener: Listener) -> ListenerHandle {
        self.inner.insert(name.into(), listener)
    }

    /// Append a persistent [`EventSubscriber`] to `name`.
    pub fn register_subscriber(
        &self,
        name: impl Into<EventName>,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> ListenerHandle {
        self.register(name, Listener::from_subscriber(subscriber))
    }

    /// Remove the listener behind `handle`.
    ///
    /// Returns `false` if it was already gone, which is not an error.
    pub fn unsubscribe(&self, handle: &ListenerHandle) -> bool {
        self.inner.remove(handle)
    }

    /// Deliver `event` to every listener subscribed to `name` at the moment
    /// of the call, in subscription order, on the caller's thread.
    ///
    /// Listener errors and panics are reported to the fault reporter and do
    /// not stop delivery to the remaining listeners.
    pub fn publish(&self, name: impl AsRef<str>, event: impl Into<Event>) -> DeliveryReport {
        let name = name.as_ref();
        let Some((name, listeners)) = self.inner.snapshot(name) else {
            trace!(event_name = %name, "No listeners for event");
            return DeliveryReport::default();
        };

        let event = event.into();
        trace!(
            event_name = %name,
            payload = event.type_name(),
            listener_count = listeners.len(),
            "Publishing event"
        );

        self.inner.deliver(&name, &event, &listeners)
    }

    /// Snapshot the listeners of `name` now and deliver on tokio's blocking
    /// pool, returning without waiting for the listeners.
    ///
    /// # Errors
    ///
    /// Returns [`EventsError::NoRuntime`](crate::EventsError::NoRuntime)
    /// when called outside a tokio runtime. No listener is consumed in
    /// that case.
    #[cfg(feature = "runtime")]
    pub fn publish_detached(
        &self,
        name: impl AsRef<str>,
        event: impl Into<Event>,
    ) -> crate::EventsResult<tokio::task::JoinHandle<DeliveryReport>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| crate::EventsError::NoRuntime)?;

        let event = event.into();
        let snapshot = self.inner.snapshot(name.as_ref());
        let inner = Arc::clone(&self.inner);

        Ok(runtime.spawn_blocking(move || match snapshot {
            Some((name, listeners)) => inner.deliver(&name, &event, &listeners),
            None => DeliveryReport::default(),
        }))
    }

    /// Number of listeners subscribed to `name`.
    #[must_use]
    pub fn listener_count(&self, name: impl AsRef<str>) -> usize {
        self.inner.read().get(name.as_ref()).map_or(0, Vec::len)
    }

    /// Total number of listeners across all channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().values().map(Vec::len).sum()
    }

    /// Whether no listener is subscribed anywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Names that currently have at least one listener, sorted.
    #[must_use]
    pub fn event_names(&self) -> Vec<EventName> {
        let mut names: Vec<EventName> = self.inner.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether the listener behind `handle` is still subscribed.
    #[must_use]
    pub fn contains(&self, handle: &ListenerHandle) -> bool {
        self.inner
            .read()
            .get(handle.event_name().as_str())
            .is_some_and(|listeners| listeners.iter().any(|l| l.id() == handle.id()))
    }

    /// Remove every listener from every channel.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.inner.write());
        let mut count: usize = 0;
        for listener in drained.values().flatten() {
            listener.retire();
            count = count.saturating_add(1);
        }
        drop(drained);
        debug!(listener_count = count, "All listeners cleared");
    }

    /// Non-owning reference for listeners that need to reach back into the
    /// registry.
    #[must_use]
    pub fn downgrade(&self) -> WeakEventRegistry {
        WeakEventRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.inner.read();
        let listener_count: usize = channels.values().map(Vec::len).sum();
        f.debug_struct("EventRegistry")
            .field("channel_count", &channels.len())
            .field("listener_count", &listener_count)
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Weak counterpart of [`EventRegistry`].
#[derive(Clone, Default)]
pub struct WeakEventRegistry {
    inner: Weak<RegistryInner>,
}

impl WeakEventRegistry {
    /// The registry, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<EventRegistry> {
        self.inner.upgrade().map(|inner| EventRegistry { inner })
    }
}

impl fmt::Debug for WeakEventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEventRegistry")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
