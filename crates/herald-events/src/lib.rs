//! Herald Events - In-process event registry for the Herald node runtime.
//!
//! This crate provides:
//! - An [`EventRegistry`] mapping event names to ordered listener sequences
//! - Persistent and once-only listeners with handle-based unsubscription
//! - Fault isolation: listener errors and panics are reported, never
//!   propagated to the publisher
//! - Queue-backed receivers for consumers that must not block publishers
//! - The conventional chain-node events ([`ChainEvent`]) and their channel
//!   names
//!
//! # Architecture
//!
//! Producers call [`EventRegistry::publish`] with an event name and a
//! payload. The registry snapshots the listeners subscribed to that name
//! and invokes them in subscription order on the caller's thread. Once
//! listeners are removed as part of taking the snapshot, so a re-entrant
//! or concurrent publish can never invoke them a second time.
//!
//! Consumers that need asynchronous hand-off use
//! [`EventRegistry::subscribe_channel`] and poll the returned
//! [`EventReceiver`].
//!
//! # Example
//!
//! ```rust
//! use herald_events::{ChainEvent, EventMetadata, EventRegistry, names};
//! use std::sync::{Arc, Mutex};
//!
//! let registry = EventRegistry::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let handle = registry.subscribe(names::NEW_BLOCK, move |event| {
//!     if let Some(ChainEvent::NewBlock { height, .. }) = event.downcast_ref::<ChainEvent>() {
//!         sink.lock().unwrap().push(*height);
//!     }
//! });
//!
//! let block = ChainEvent::NewBlock {
//!     metadata: EventMetadata::new("chain"),
//!     height: 42,
//!     hash: "0xabc".to_string(),
//!     tx_count: 0,
//! };
//! registry.publish(block.event_name(), block);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![42]);
//! assert!(registry.unsubscribe(&handle));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod chain;
mod error;
mod event;
mod fault;
mod listener;
mod options;
#[cfg(feature = "runtime")]
mod receiver;
mod registry;
#[cfg(test)]
mod test_logs;

pub use chain::{ChainEvent, EventMetadata, names};
pub use error::{EventsError, EventsResult, ListenerError, ListenerResult};
pub use event::{Event, EventName};
pub use fault::{FaultKind, FaultReporter, ListenerFault, TracingFaultReporter};
pub use listener::{
    ANONYMOUS_LISTENER, EventSubscriber, Listener, ListenerHandle, ListenerId, ListenerMode,
};
pub use options::{DEFAULT_CHANNEL_CAPACITY, RegistryOptions};
#[cfg(feature = "runtime")]
pub use receiver::EventReceiver;
pub use registry::{DeliveryReport, EventRegistry, WeakEventRegistry};
