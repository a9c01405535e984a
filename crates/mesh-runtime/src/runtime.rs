//! # Runtime
//!
//! Owns the fabric, the shared registries, the node registry, and the
//! flow-balance monitor. Nodes created through the factory share one gate
//! pipeline, one view registry, and one stream hand-off table.

use crate::config::RuntimeConfig;
use mesh_crypto::NodeIdentity;
use mesh_fabric::{Fabric, InMemoryFabric};
use mesh_flow_balance::FlowBalanceMonitor;
use mesh_gates::GatePipeline;
use mesh_node::{Node, NodeError, NodeOptions, StreamHandoff};
use mesh_types::NodeId;
use mesh_views::ViewRegistry;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Node id reserved for the flow-balance monitor's signing identity.
const MONITOR_NODE_ID: &str = "flow-balance";

/// Errors from runtime assembly.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The fabric could not be brought up.
    #[error(transparent)]
    Transport(#[from] mesh_fabric::FabricError),

    /// A node operation failed during runtime assembly or shutdown.
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// The assembled runtime.
pub struct Runtime {
    config: RuntimeConfig,
    fabric: Arc<InMemoryFabric>,
    views: Arc<ViewRegistry>,
    gates: Arc<GatePipeline>,
    handoff: Arc<StreamHandoff>,
    monitor: Option<Arc<FlowBalanceMonitor>>,
    nodes: Mutex<Vec<Node>>,
}

/// Connect the fabric, start the monitor when enabled, and return the
/// runtime handle.
pub async fn initialise(config: RuntimeConfig) -> Result<Runtime, RuntimeError> {
    let fabric = Arc::new(InMemoryFabric::new());
    fabric.set_durable_enabled(config.enable_durable.0);

    let views = Arc::new(ViewRegistry::new());
    let gates = Arc::new(GatePipeline::new(
        config.authentication.enforced,
        config.separator,
    ));
    let handoff = Arc::new(StreamHandoff::new());

    let monitor = if config.flow_balance.enabled {
        let monitor = Arc::new(FlowBalanceMonitor::new(
            fabric.clone(),
            fabric.admin(),
            NodeIdentity::generate(NodeId::new(MONITOR_NODE_ID)),
            config.flow_balance,
        ));
        monitor.start();
        Some(monitor)
    } else {
        None
    };

    info!(
        separator = ?config.separator,
        durable = config.enable_durable.0,
        flow_balance = config.flow_balance.enabled,
        "Runtime initialised"
    );

    Ok(Runtime {
        config,
        fabric,
        views,
        gates,
        handoff,
        monitor,
        nodes: Mutex::new(Vec::new()),
    })
}

impl Runtime {
    /// Create a node and register it for ordered shutdown.
    ///
    /// # Errors
    ///
    /// `NodeError::Lifecycle` for duplicate ids; transport errors when the
    /// node's fabric sinks cannot be installed.
    pub async fn create_node(
        &self,
        id: impl Into<NodeId>,
        options: NodeOptions,
    ) -> Result<Node, NodeError> {
        let id = id.into();
        {
            let nodes = self.nodes.lock();
            if nodes.iter().any(|node| node.id() == &id) {
                return Err(NodeError::Lifecycle(format!(
                    "node `{id}` already exists in this runtime"
                )));
            }
        }

        let node = Node::start(
            id,
            self.fabric.clone(),
            self.views.clone(),
            self.gates.clone(),
            self.handoff.clone(),
            self.config.separator,
            options,
        )
        .await?;

        self.nodes.lock().push(node.clone());
        Ok(node)
    }

    /// The underlying fabric.
    #[must_use]
    pub fn fabric(&self) -> Arc<dyn Fabric> {
        self.fabric.clone()
    }

    /// The in-memory fabric handle (connectivity simulation in tests).
    #[must_use]
    pub fn memory_fabric(&self) -> Arc<InMemoryFabric> {
        self.fabric.clone()
    }

    /// The process-wide view registry.
    #[must_use]
    pub fn views(&self) -> Arc<ViewRegistry> {
        self.views.clone()
    }

    /// The shared gate pipeline (schema registrations, access policy).
    #[must_use]
    pub fn gates(&self) -> Arc<GatePipeline> {
        self.gates.clone()
    }

    /// The runtime's configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Currently registered node count.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Dispose nodes in insertion order, then the flow-balance monitor,
    /// then the fabric.
    pub async fn shutdown(&self) {
        let nodes: Vec<Node> = self.nodes.lock().drain(..).collect();
        for node in nodes {
            node.shutdown().await;
        }

        if let Some(monitor) = &self.monitor {
            monitor.shutdown();
        }

        self.fabric.close().await;
        info!("Runtime shut down");
    }
}
