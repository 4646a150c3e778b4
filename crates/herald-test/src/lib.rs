//! Herald Test - Shared test utilities for the Herald node runtime.
//!
//! This crate provides recording listeners, fault collectors, fixtures and
//! harness helpers that can be used across Herald crates as a
//! dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! herald-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use herald_events::{EventRegistry, names};
//! use herald_test::{DeliveryRecorder, test_new_block};
//!
//! #[test]
//! fn test_block_listener() {
//!     let registry = EventRegistry::new();
//!     let recorder = DeliveryRecorder::new();
//!     registry.subscribe(names::NEW_BLOCK, recorder.listener("A"));
//!
//!     registry.publish(names::NEW_BLOCK, test_new_block(7));
//!
//!     assert_eq!(recorder.labels(), vec!["A"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod recorder;

pub use fixtures::*;
pub use harness::*;
pub use recorder::*;
