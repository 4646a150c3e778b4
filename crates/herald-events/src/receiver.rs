//! Queue-backed consumers for listeners that must not block the publisher.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::error::ListenerError;
use crate::event::{Event, EventName};
use crate::listener::{Listener, ListenerHandle};
use crate::registry::{EventRegistry, WeakEventRegistry};

/// Receiving end of a channel subscription.
///
/// The registry-side listener only enqueues, so the publisher never waits
/// on this consumer. When the queue is full the event is dropped for this
/// receiver and a [`ListenerError::ChannelFull`] fault is reported.
/// Dropping the receiver unsubscribes it.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: mpsc::Receiver<Event>,
    handle: ListenerHandle,
    registry: WeakEventRegistry,
}

impl EventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` once the registry has been dropped or cleared and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Receive the next event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Handle of the registry-side listener.
    #[must_use]
    pub fn handle(&self) -> &ListenerHandle {
        &self.handle
    }

    /// Channel this receiver is subscribed to.
    #[must_use]
    pub fn event_name(&self) -> &EventName {
        self.handle.event_name()
    }
}

impl Drop for EventReceiver {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(&self.handle);
        }
    }
}

impl EventRegistry {
    /// Subscribe a bounded queue to `name` and return its receiving end.
    ///
    /// Queue size comes from
    /// [`RegistryOptions::channel_capacity`](crate::RegistryOptions).
    pub fn subscribe_channel(&self, name: impl Into<EventName>) -> EventReceiver {
        let name = name.into();
        let (sender, receiver) = mpsc::channel(self.options().channel_capacity.max(1));

        let queue = name.clone();
        let listener = Listener::fallible(move |event| match sender.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ListenerError::ChannelFull(queue.clone())),
            Err(TrySendError::Closed(_)) => Err(ListenerError::ReceiverClosed(queue.clone())),
        })
        .with_label(format!("channel:{name}"));

        let handle = self.register(name, listener);
        debug!(
            event_name = %handle.event_name(),
            listener_id = %handle.id(),
            capacity = self.options().channel_capacity,
            "Channel receiver subscribed"
        );

        EventReceiver {
            receiver,
            handle,
            registry: self.downgrade(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::ListenerFault;
    use crate::options::RegistryOptions;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_channel_receives_in_order() {
        let registry = EventRegistry::new();
        let mut receiver = registry.subscribe_channel("chain.new_block");

        registry.publish("chain.new_block", Event::new(1_u64));
        registry.publish("chain.new_block", Event::new(2_u64));

        let first = receiver.recv().await.unwrap();
        let second = receiver.recv().await.unwrap();
        assert_eq!(first.downcast_ref::<u64>(), Some(&1));
        assert_eq!(second.downcast_ref::<u64>(), Some(&2));
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_full_channel_reports_fault() {
        let faults = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&faults);
        let registry = EventRegistry::from_parts(
            RegistryOptions::default().with_channel_capacity(1),
            Arc::new(move |fault: &ListenerFault| {
                sink.lock().unwrap().push(fault.to_string());
            }),
        );
        let mut receiver = registry.subscribe_channel("x");

        let first = registry.publish("x", Event::new(1_u8));
        let second = registry.publish("x", Event::new(2_u8));

        assert_eq!(first.delivered, 1);
        assert_eq!(second.failed, 1);
        assert_eq!(faults.lock().unwrap().len(), 1);
        assert!(faults.lock().unwrap()[0].contains("is full"));

        let kept = receiver.recv().await.unwrap();
        assert_eq!(kept.downcast_ref::<u8>(), Some(&1));
    }

    #[tokio::test]
    async fn test_drop_receiver_unsubscribes() {
        let registry = EventRegistry::new();
        let receiver = registry.subscribe_channel("x");
        let handle = receiver.handle().clone();
        assert!(registry.contains(&handle));

        drop(receiver);
        assert!(!registry.contains(&handle));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_recv_ends_when_registry_dropped() {
        let registry = EventRegistry::new();
        let mut receiver = registry.subscribe_channel("x");
        registry.publish("x", Event::empty());
        drop(registry);

        assert!(receiver.recv().await.unwrap().is_empty());
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_receiver_label_and_name() {
        let registry = EventRegistry::new();
        let receiver = registry.subscribe_channel("chain.reorg");
        assert_eq!(receiver.event_name().as_str(), "chain.reorg");
        assert_eq!(registry.listener_count("chain.reorg"), 1);
    }
}
