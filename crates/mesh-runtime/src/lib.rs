//! # Mesh Runtime - Lifecycle and Factory
//!
//! The embedder's entry point: `initialise(config)` connects the fabric,
//! starts the flow-balance monitor when enabled, and returns the runtime
//! handle whose factory creates nodes. Shutdown disposes nodes in insertion
//! order, then the monitor, then the fabric.
//!
//! ```rust,ignore
//! let runtime = initialise(RuntimeConfig::default()).await?;
//! let node = runtime.create_node("order-service", NodeOptions::default()).await?;
//! let _sub = node.on("order.*", handler).await?;
//! runtime.shutdown().await;
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod runtime;

pub use config::{AuthConfig, FabricConfig, RuntimeConfig};
pub use runtime::{initialise, Runtime, RuntimeError};

// The embedder-facing surface re-exported in one place.
pub use mesh_flow_balance::{FlowBalanceConfig, Thresholds};
pub use mesh_node::{
    for_group, AcceptPolicy, Node, NodeError, NodeGroup, NodeOptions, Reply, SendResult,
};
pub use mesh_telemetry::{init_telemetry, TelemetryConfig};
pub use mesh_types::{EventShell, NodeId, Separator};
