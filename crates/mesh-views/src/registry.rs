//! # View Registry
//!
//! Process-wide mapping from node id to its latest state snapshot, plus the
//! selector memoisation layer. Many readers, one writer per key.

use crate::selector::Selector;
use dashmap::DashMap;
use mesh_types::NodeId;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
struct VersionedSnapshot {
    version: u64,
    state: Value,
}

#[derive(Debug, Clone)]
struct CachedView {
    version: u64,
    value: Value,
}

/// The process-wide view registry.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    snapshots: DashMap<NodeId, VersionedSnapshot>,
    cache: DashMap<(NodeId, String), CachedView>,
}

impl ViewRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a node's new state snapshot. Called synchronously by the
    /// owning node on every state mutation; bumps the version, which
    /// invalidates cached selector results.
    pub fn publish(&self, node_id: &NodeId, state: Value) {
        let mut entry = self
            .snapshots
            .entry(node_id.clone())
            .or_insert(VersionedSnapshot {
                version: 0,
                state: Value::Null,
            });
        entry.version += 1;
        entry.state = state;
        debug!(node_id = %node_id, version = entry.version, "View snapshot published");
    }

    /// Remove a node's snapshot and its cached views (node shutdown).
    pub fn remove(&self, node_id: &NodeId) {
        self.snapshots.remove(node_id);
        self.cache.retain(|(cached_node, _), _| cached_node != node_id);
    }

    /// Whether a node has a registered snapshot.
    #[must_use]
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.snapshots.contains_key(node_id)
    }

    /// Read a single node's view through a selector.
    ///
    /// Missing nodes yield `None`. Results are memoised per
    /// `(node, selector key)` until the node's next state write.
    #[must_use]
    pub fn get(&self, node_id: &NodeId, selector: &Selector) -> Option<Value> {
        let snapshot = self.snapshots.get(node_id)?;
        let version = snapshot.version;
        let cache_key = (node_id.clone(), selector.key().to_string());

        if let Some(cached) = self.cache.get(&cache_key) {
            if cached.version == version {
                return Some(cached.value.clone());
            }
        }

        let value = selector.apply(&snapshot.state);
        drop(snapshot);
        self.cache.insert(
            cache_key,
            CachedView {
                version,
                value: value.clone(),
            },
        );
        Some(value)
    }

    /// Run a selector against each listed node's snapshot, in order.
    /// Missing nodes yield `None` at their position.
    #[must_use]
    pub fn collect(&self, nodes: &[NodeId], selector: &Selector) -> Vec<Option<Value>> {
        nodes.iter().map(|id| self.get(id, selector)).collect()
    }

    /// Number of registered snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no snapshots are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
