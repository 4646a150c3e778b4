//! Recording listeners and fault collectors.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use herald_events::{
    Event, EventName, FaultReporter, ListenerError, ListenerFault, ListenerId, ListenerResult,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking listener must not take the recorder down with it.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Label passed to the listener factory.
    pub label: String,
    /// Event the listener received.
    pub event: Event,
}

/// Shared log of listener invocations, in the order they happened.
///
/// Every listener built from the same recorder appends to one log, so
/// the log shows the invocation order across listeners.
#[derive(Debug, Clone, Default)]
pub struct DeliveryRecorder {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl DeliveryRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener callback that records `label` and the event.
    pub fn listener(&self, label: impl Into<String>) -> impl Fn(&Event) + Send + Sync + 'static {
        let deliveries = Arc::clone(&self.deliveries);
        let label = label.into();
        move |event: &Event| {
            lock(&deliveries).push(Delivery {
                label: label.clone(),
                event: event.clone(),
            });
        }
    }

    /// Fallible callback that records, then fails with `message`.
    pub fn failing_listener(
        &self,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> impl Fn(&Event) -> ListenerResult + Send + Sync + 'static {
        let record = self.listener(label);
        let message = message.into();
        move |event: &Event| {
            record(event);
            Err(ListenerError::msg(message.clone()))
        }
    }

    /// Callback that records, then panics with `message`.
    pub fn panicking_listener(
        &self,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> impl Fn(&Event) + Send + Sync + 'static {
        let record = self.listener(label);
        let message = message.into();
        move |event: &Event| {
            record(event);
            panic!("{message}");
        }
    }

    /// Labels in invocation order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        lock(&self.deliveries)
            .iter()
            .map(|d| d.label.clone())
            .collect()
    }

    /// All recorded deliveries.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        lock(&self.deliveries).clone()
    }

    /// Number of times listeners labelled `label` ran.
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        lock(&self.deliveries)
            .iter()
            .filter(|d| d.label == label)
            .count()
    }

    /// Total number of recorded invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.deliveries).len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.deliveries).is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        lock(&self.deliveries).clear();
    }
}

/// Owned summary of a [`ListenerFault`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedFault {
    /// Channel the fault happened on.
    pub event_name: EventName,
    /// Listener that failed.
    pub listener_id: ListenerId,
    /// Listener label.
    pub label: String,
    /// Whether the listener panicked.
    pub panicked: bool,
    /// Rendered fault.
    pub message: String,
}

/// [`FaultReporter`] that keeps every fault for later assertions.
#[derive(Debug, Clone, Default)]
pub struct FaultCollector {
    faults: Arc<Mutex<Vec<CollectedFault>>>,
}

impl FaultCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Faults collected so far.
    #[must_use]
    pub fn faults(&self) -> Vec<CollectedFault> {
        lock(&self.faults).clone()
    }

    /// Number of collected faults.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.faults).len()
    }

    /// Whether no fault was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.faults).is_empty()
    }

    /// Number of collected panics.
    #[must_use]
    pub fn panic_count(&self) -> usize {
        lock(&self.faults).iter().filter(|f| f.panicked).count()
    }
}

impl FaultReporter for FaultCollector {
    fn report(&self, fault: &ListenerFault) {
        lock(&self.faults).push(CollectedFault {
            event_name: fault.event_name.clone(),
            listener_id: fault.listener_id,
            label: fault.label.clone(),
            panicked: fault.is_panic(),
            message: fault.to_string(),
        });
    }
}
