//! # Dispatch Context
//!
//! The mutable mapping built for one event delivery. Handlers in the same
//! chain observe each other's writes; the record is discarded when the
//! dispatch completes.

use mesh_types::NodeId;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Default)]
struct ContextData {
    node: Option<NodeId>,
    error: Option<String>,
    extras: Map<String, Value>,
}

/// Cheaply clonable handle over the per-dispatch context record.
///
/// One context per top-level dispatch. Implementations must not share a
/// context across separate dispatches.
#[derive(Debug, Clone, Default)]
pub struct FlowContext {
    data: Arc<Mutex<ContextData>>,
}

impl FlowContext {
    /// Create an empty context for a fresh dispatch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context pre-populated with the handling node's id, as group
    /// subscriptions do.
    #[must_use]
    pub fn for_node(node: NodeId) -> Self {
        let ctx = Self::new();
        ctx.set_node(node);
        ctx
    }

    /// The node handling this dispatch, when set.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.data.lock().node.clone()
    }

    /// Record the handling node.
    pub fn set_node(&self, node: NodeId) {
        self.data.lock().node = Some(node);
    }

    /// The error branch recorded by an error-handling combinator.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.data.lock().error.clone()
    }

    /// Record the error branch.
    pub fn set_error(&self, message: impl Into<String>) {
        self.data.lock().error = Some(message.into());
    }

    /// Read an extra field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().extras.get(key).cloned()
    }

    /// Write an extra field, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.lock().extras.insert(key.into(), value)
    }

    /// Remove an extra field.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.data.lock().extras.remove(key)
    }

    /// Increment a numeric field (loop counters), returning the new value.
    /// Missing or non-numeric fields start from zero.
    pub fn increment(&self, key: &str) -> u64 {
        let mut data = self.data.lock();
        let current = data.extras.get(key).and_then(Value::as_u64).unwrap_or(0);
        let next = current + 1;
        data.extras.insert(key.to_string(), Value::from(next));
        next
    }

    /// Snapshot of all extra fields.
    #[must_use]
    pub fn extras(&self) -> Map<String, Value> {
        self.data.lock().extras.clone()
    }
}
