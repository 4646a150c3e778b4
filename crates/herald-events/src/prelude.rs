//! Prelude module - commonly used types for convenient import.
//!
//! Use `use herald_events::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use herald_events::prelude::*;
//!
//! let registry = EventRegistry::new();
//! let handle = registry.subscribe_once(names::NODE_STARTED, |_event| {});
//!
//! let report = registry.publish(names::NODE_STARTED, Event::empty());
//! assert_eq!(report.delivered, 1);
//! assert!(!registry.unsubscribe(&handle));
//! ```

// Registry
pub use crate::{DeliveryReport, EventRegistry, RegistryOptions, WeakEventRegistry};

#[cfg(feature = "runtime")]
pub use crate::EventReceiver;

// Events
pub use crate::{ChainEvent, Event, EventMetadata, EventName, names};

// Listeners
pub use crate::{EventSubscriber, Listener, ListenerHandle, ListenerMode};

// Errors and faults
pub use crate::{FaultReporter, ListenerError, ListenerFault, ListenerResult};
