//! # Admin Surface
//!
//! The read-only view the flow-balance monitor polls: per-consumer delivery
//! counters and per-subject durable stream statistics.

use crate::FabricError;
use async_trait::async_trait;

/// Delivery statistics for one consumer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsumerInfo {
    /// Consumer name, as supplied at subscribe time.
    pub consumer: String,
    /// Subject the consumer listens on.
    pub subject: String,
    /// Messages routed but not yet received by the consumer.
    pub pending: u64,
    /// Messages handed to the consumer.
    pub delivered: u64,
    /// Messages the consumer acknowledged after processing.
    pub acked: u64,
    /// Deliveries that failed (full buffers, redeliveries).
    pub redelivered: u64,
}

/// Statistics for one durable subject.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamInfo {
    /// The durable subject.
    pub subject: String,
    /// Retained message count.
    pub messages: u64,
    /// Retained payload bytes.
    pub bytes: u64,
}

/// Read-only admin interface over the fabric.
#[async_trait]
pub trait FabricAdmin: Send + Sync {
    /// Statistics for a single consumer by name.
    async fn consumer_info(&self, consumer: &str) -> Result<ConsumerInfo, FabricError>;

    /// Statistics for every active consumer.
    async fn list_consumers(&self) -> Result<Vec<ConsumerInfo>, FabricError>;

    /// Statistics for a durable subject.
    async fn stream_info(&self, subject: &str) -> Result<StreamInfo, FabricError>;
}
