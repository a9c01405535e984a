//! # Fabric Trait
//!
//! The seam between the runtime core and whichever broker carries the
//! traffic. Implementations must provide fire-and-forget publish,
//! per-subject subscribe with fan-out to the local process, reply-expected
//! request, and the admin surface.

use crate::admin::FabricAdmin;
use crate::errors::FabricError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Per-consumer delivery counters, shared between the router and the
/// subscription handle.
#[derive(Debug, Default)]
pub(crate) struct DeliveryCounters {
    pub(crate) pending: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) acked: AtomicU64,
    pub(crate) redelivered: AtomicU64,
}

/// Receipt attached to a routed message; tracks received/acked exactly once.
#[derive(Debug)]
pub(crate) struct Receipt {
    counters: Arc<DeliveryCounters>,
    received: AtomicBool,
    acked: AtomicBool,
}

impl Receipt {
    pub(crate) fn new(counters: Arc<DeliveryCounters>) -> Self {
        Self {
            counters,
            received: AtomicBool::new(false),
            acked: AtomicBool::new(false),
        }
    }

    fn on_received(&self) {
        if !self.received.swap(true, Ordering::AcqRel) {
            self.counters.pending.fetch_sub(1, Ordering::AcqRel);
            self.counters.delivered.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn on_acked(&self) {
        if !self.acked.swap(true, Ordering::AcqRel) {
            self.counters.acked.fetch_add(1, Ordering::AcqRel);
        }
    }
}

/// A message delivered by the fabric.
#[derive(Debug)]
pub struct FabricMessage {
    /// The concrete subject the message was published on.
    pub subject: String,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
    /// Reply subject, present on request messages.
    pub reply: Option<String>,
    pub(crate) receipt: Option<Receipt>,
}

impl FabricMessage {
    /// Build a message without delivery tracking (tests, loopback).
    #[must_use]
    pub fn new(subject: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            payload,
            reply: None,
            receipt: None,
        }
    }

    /// Acknowledge successful processing. Idempotent.
    pub fn ack(&self) {
        if let Some(receipt) = &self.receipt {
            receipt.on_acked();
        }
    }
}

/// A live subscription. Dropping it (or calling `unsubscribe`) removes the
/// consumer from the fabric.
pub struct FabricSubscription {
    subject: String,
    consumer: String,
    receiver: mpsc::Receiver<FabricMessage>,
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl FabricSubscription {
    /// Assemble a subscription handle. External fabric bindings feed
    /// decoded messages into the channel and clean their broker-side
    /// consumer up in `on_drop`.
    pub fn new(
        subject: String,
        consumer: String,
        receiver: mpsc::Receiver<FabricMessage>,
        on_drop: Box<dyn FnOnce() + Send>,
    ) -> Self {
        Self {
            subject,
            consumer,
            receiver,
            on_drop: Some(on_drop),
        }
    }

    /// Receive the next message.
    ///
    /// Returns `None` once the fabric is closed and the buffer is drained.
    pub async fn recv(&mut self) -> Option<FabricMessage> {
        let message = self.receiver.recv().await?;
        if let Some(receipt) = &message.receipt {
            receipt.on_received();
        }
        Some(message)
    }

    /// The subject (possibly a wildcard) this subscription listens on.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The consumer name used for admin reporting.
    #[must_use]
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Explicitly dispose the subscription.
    pub fn unsubscribe(mut self) {
        if let Some(dispose) = self.on_drop.take() {
            dispose();
        }
    }
}

impl Drop for FabricSubscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.on_drop.take() {
            dispose();
        }
    }
}

impl std::fmt::Debug for FabricSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FabricSubscription")
            .field("subject", &self.subject)
            .field("consumer", &self.consumer)
            .finish()
    }
}

/// The pluggable broker fabric.
#[async_trait]
pub trait Fabric: Send + Sync {
    /// Fire-and-forget publish.
    ///
    /// # Errors
    ///
    /// `FabricError::Disconnected` fails fast while the fabric is
    /// disconnected; `FabricError::Closed` after shutdown.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), FabricError>;

    /// Subscribe under an explicit consumer name (used for admin lag
    /// reporting).
    async fn subscribe_as(
        &self,
        consumer: &str,
        subject: &str,
    ) -> Result<FabricSubscription, FabricError>;

    /// Subscribe with the subject as the consumer name.
    async fn subscribe(&self, subject: &str) -> Result<FabricSubscription, FabricError> {
        self.subscribe_as(subject, subject).await
    }

    /// Reply-expected request with a deadline.
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, FabricError>;

    /// The admin surface for the flow-balance monitor.
    fn admin(&self) -> Arc<dyn FabricAdmin>;

    /// Close the fabric; all subscriptions end.
    async fn close(&self);
}
