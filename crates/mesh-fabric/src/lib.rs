//! # Mesh Fabric - Broker Abstraction
//!
//! The runtime core depends on a pluggable message fabric with four
//! operations: fire-and-forget publish, per-subject subscribe with fan-out,
//! reply-expected request, and an admin surface the flow-balance monitor
//! polls for consumer lag.
//!
//! This crate defines the `Fabric` and `FabricAdmin` traits, the subject
//! naming scheme, a bounded exponential back-off helper, and an in-memory
//! fabric used by single-process deployments and the test suite. External
//! broker bindings implement the same traits.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod admin;
pub mod backoff;
pub mod errors;
pub mod fabric;
pub mod memory;
pub mod subjects;

// Re-export main types
pub use admin::{ConsumerInfo, FabricAdmin, StreamInfo};
pub use backoff::Backoff;
pub use errors::FabricError;
pub use fabric::{Fabric, FabricMessage, FabricSubscription};
pub use memory::InMemoryFabric;

/// Maximum events buffered per subscriber before deliveries are counted
/// as failed.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum retained messages per durable subject in the in-memory fabric.
pub const DEFAULT_DURABLE_RETENTION: usize = 1000;
