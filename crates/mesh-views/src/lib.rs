//! # Mesh Views - Global State Registry
//!
//! Cross-node snapshot reads. Writers (nodes) publish their current state
//! synchronously on mutation; readers run selectors against the latest
//! committed snapshot. A view read is point-in-time: no cross-node
//! atomicity is guaranteed, and readers never observe a torn value.
//!
//! Selector results are memoised per `(node, selector key)` and invalidated
//! by the snapshot version bump that accompanies every write.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod registry;
pub mod selector;

pub use registry::ViewRegistry;
pub use selector::Selector;
