//! # Node Groups (Confluence)
//!
//! Collective operations over an ordered sequence of nodes: install the
//! same handler everywhere, fan a send out through every member, or have
//! every member broadcast. Failures are isolated per member; one node's
//! error never blocks the others' responses.

use crate::errors::NodeError;
use crate::node::{Disposer, Node};
use crate::pending::{Reply, SendResult};
use futures::future::join_all;
use mesh_continuum::Handler;
use mesh_types::{EventShell, NodeId};
use std::collections::HashMap;
use std::time::Duration;

/// An ordered group of nodes.
pub struct NodeGroup {
    nodes: Vec<Node>,
}

/// Build a group over an ordered slice of nodes.
#[must_use]
pub fn for_group(nodes: &[Node]) -> NodeGroup {
    NodeGroup {
        nodes: nodes.to_vec(),
    }
}

/// Aggregate of the in-flight sends of one group operation.
pub struct GroupSendResult {
    entries: Vec<(NodeId, Result<SendResult, NodeError>)>,
}

impl GroupSendResult {
    /// Await every member's reply under one shared deadline. The result
    /// maps each member to its own outcome; failing members report their
    /// error without affecting the rest.
    pub async fn resolve(self, timeout: Duration) -> HashMap<NodeId, Result<Reply, NodeError>> {
        let pending = self.entries.into_iter().map(|(id, entry)| async move {
            match entry {
                Ok(send_result) => (id, send_result.resolve(timeout).await),
                Err(e) => (id, Err(e)),
            }
        });
        join_all(pending).await.into_iter().collect()
    }
}

impl NodeGroup {
    /// Members in order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Install the same handler on every member. The per-invocation
    /// context carries the handling member's id.
    ///
    /// # Errors
    ///
    /// Fails on the first member that rejects the pattern; disposers
    /// already returned for earlier members are dropped (and therefore
    /// disposed) with the error.
    pub async fn on(&self, pattern: &str, handler: Handler) -> Result<Vec<Disposer>, NodeError> {
        let mut disposers = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            disposers.push(node.on(pattern, handler.clone()).await?);
        }
        Ok(disposers)
    }

    /// Every member sends the event to `target`.
    pub async fn send(&self, target: &NodeId, shell: EventShell) -> GroupSendResult {
        let mut entries = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            entries.push((node.id().clone(), node.send(target, shell.clone()).await));
        }
        GroupSendResult { entries }
    }

    /// Every member sends the event to itself.
    pub async fn send_each(&self, shell: EventShell) -> GroupSendResult {
        let mut entries = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            entries.push((node.id().clone(), node.send(node.id(), shell.clone()).await));
        }
        GroupSendResult { entries }
    }

    /// Every member broadcasts the event. With `k` members all subscribed,
    /// `k * k` deliveries are expected.
    pub async fn broadcast(&self, shell: EventShell) -> Vec<(NodeId, Result<(), NodeError>)> {
        let mut results = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            results.push((node.id().clone(), node.broadcast(shell.clone()).await));
        }
        results
    }
}
