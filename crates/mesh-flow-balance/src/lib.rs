//! # Mesh Flow-Balance - Invisible Resilience
//!
//! Passive, stream-lag-driven detection of node failure, bottleneck,
//! partition, and overload patterns. The monitor polls the fabric's admin
//! surface on a configurable interval, derives per-consumer flow metrics,
//! runs them through a hysteresis health machine, and emits first-class
//! system events (`node.down`, `system.down`) into the same fabric every
//! other participant listens on.
//!
//! Observers consume the emitted events only; the monitor owns all of its
//! state.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod health;
pub mod monitor;
pub mod patterns;

// Re-export main types
pub use config::{FlowBalanceConfig, Thresholds};
pub use health::{HealthMachine, NodeHealth};
pub use monitor::FlowBalanceMonitor;
pub use patterns::{ConsumerSample, FlowPattern};

/// Event type emitted for per-node patterns.
pub const NODE_DOWN_EVENT: &str = "node.down";

/// Event type emitted for cohort patterns.
pub const SYSTEM_DOWN_EVENT: &str = "system.down";

/// Samples retained per consumer.
pub const HISTORY_DEPTH: usize = 20;
