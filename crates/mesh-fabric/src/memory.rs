//! # In-Memory Fabric
//!
//! Subject-pattern fan-out router over bounded mpsc channels. Suitable for
//! single-process deployments and the test suite; distributed deployments
//! bind an external broker behind the same trait.
//!
//! Durable subjects retain their recent messages in a bounded per-subject
//! log surfaced through `StreamInfo`. Disconnection is simulable: publishes
//! fail fast while disconnected, subscriptions survive and resume on
//! reconnect.

use crate::admin::{ConsumerInfo, FabricAdmin, StreamInfo};
use crate::errors::FabricError;
use crate::fabric::{DeliveryCounters, Fabric, FabricMessage, FabricSubscription, Receipt};
use crate::subjects::{subject_is_durable, subject_matches};
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_DURABLE_RETENTION};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

struct SubscriberEntry {
    id: u64,
    consumer: String,
    subject: String,
    sender: mpsc::Sender<FabricMessage>,
    counters: Arc<DeliveryCounters>,
}

#[derive(Default)]
struct DurableLog {
    messages: VecDeque<Vec<u8>>,
    bytes: u64,
}

struct Shared {
    subscribers: RwLock<Vec<SubscriberEntry>>,
    durable: RwLock<HashMap<String, DurableLog>>,
    durable_enabled: AtomicBool,
    connected: AtomicBool,
    closed: AtomicBool,
    next_id: AtomicU64,
    capacity: usize,
    retention: usize,
}

/// In-memory implementation of the fabric.
pub struct InMemoryFabric {
    shared: Arc<Shared>,
}

impl InMemoryFabric {
    /// Create a fabric with default channel capacity and durable retention.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a fabric with an explicit per-subscriber channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                subscribers: RwLock::new(Vec::new()),
                durable: RwLock::new(HashMap::new()),
                durable_enabled: AtomicBool::new(true),
                connected: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
                capacity,
                retention: DEFAULT_DURABLE_RETENTION,
            }),
        }
    }

    /// Disable or re-enable the durable channel (`enable_durable: false`
    /// runtimes publish everything best-effort).
    pub fn set_durable_enabled(&self, enabled: bool) {
        self.shared.durable_enabled.store(enabled, Ordering::Release);
    }

    /// Simulate a transport disconnect or reconnect.
    ///
    /// While disconnected, publishes fail fast with
    /// `FabricError::Disconnected`; existing subscriptions stay installed
    /// and resume receiving after reconnect.
    pub fn set_connected(&self, connected: bool) {
        self.shared.connected.store(connected, Ordering::Release);
        debug!(connected, "Fabric connectivity changed");
    }

    /// Whether the fabric currently accepts publishes.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.read().len()
    }

    fn publish_internal(
        &self,
        subject: &str,
        payload: Vec<u8>,
        reply: Option<String>,
    ) -> Result<usize, FabricError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(FabricError::Closed);
        }
        if !self.shared.connected.load(Ordering::Acquire) {
            return Err(FabricError::Disconnected);
        }
        validate_subject(subject, false)?;

        if self.shared.durable_enabled.load(Ordering::Acquire) && subject_is_durable(subject) {
            let mut durable = self.shared.durable.write();
            let log = durable.entry(subject.to_string()).or_default();
            log.bytes += payload.len() as u64;
            log.messages.push_back(payload.clone());
            while log.messages.len() > self.shared.retention {
                if let Some(evicted) = log.messages.pop_front() {
                    log.bytes = log.bytes.saturating_sub(evicted.len() as u64);
                }
            }
        }

        let mut matched = 0;
        let mut stale = false;
        {
            let subscribers = self.shared.subscribers.read();
            for entry in subscribers.iter() {
                if !subject_matches(&entry.subject, subject) {
                    continue;
                }
                matched += 1;

                let message = FabricMessage {
                    subject: subject.to_string(),
                    payload: payload.clone(),
                    reply: reply.clone(),
                    receipt: Some(Receipt::new(entry.counters.clone())),
                };
                // Counted before the send so a fast consumer can never
                // observe its receipt ahead of the increment.
                entry.counters.pending.fetch_add(1, Ordering::AcqRel);
                match entry.sender.try_send(message) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        entry.counters.pending.fetch_sub(1, Ordering::AcqRel);
                        entry.counters.redelivered.fetch_add(1, Ordering::AcqRel);
                        warn!(
                            subject = %subject,
                            consumer = %entry.consumer,
                            "Subscriber buffer full, delivery failed"
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        entry.counters.pending.fetch_sub(1, Ordering::AcqRel);
                        stale = true;
                    }
                }
            }
        }

        if stale {
            let mut subscribers = self.shared.subscribers.write();
            subscribers.retain(|entry| !entry.sender.is_closed());
        }

        debug!(subject = %subject, receivers = matched, "Message published");
        Ok(matched)
    }
}

impl Default for InMemoryFabric {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fabric for InMemoryFabric {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), FabricError> {
        self.publish_internal(subject, payload, None).map(|_| ())
    }

    async fn subscribe_as(
        &self,
        consumer: &str,
        subject: &str,
    ) -> Result<FabricSubscription, FabricError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(FabricError::Closed);
        }
        validate_subject(subject, true)?;

        let (sender, receiver) = mpsc::channel(self.shared.capacity);
        let id = self.shared.next_id.fetch_add(1, Ordering::AcqRel);
        let counters = Arc::new(DeliveryCounters::default());

        self.shared.subscribers.write().push(SubscriberEntry {
            id,
            consumer: consumer.to_string(),
            subject: subject.to_string(),
            sender,
            counters,
        });
        debug!(subject = %subject, consumer = %consumer, "Subscription installed");

        let shared = self.shared.clone();
        let on_drop = Box::new(move || {
            shared.subscribers.write().retain(|entry| entry.id != id);
        });

        Ok(FabricSubscription::new(
            subject.to_string(),
            consumer.to_string(),
            receiver,
            on_drop,
        ))
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, FabricError> {
        let inbox = format!("_inbox.{}", Uuid::new_v4());
        let mut reply_sub = self.subscribe_as(&inbox, &inbox).await?;

        let matched = self.publish_internal(subject, payload, Some(inbox))?;
        if matched == 0 {
            return Err(FabricError::NoResponders {
                subject: subject.to_string(),
            });
        }

        match tokio::time::timeout(timeout, reply_sub.recv()).await {
            Ok(Some(message)) => {
                message.ack();
                Ok(message.payload)
            }
            Ok(None) => Err(FabricError::Closed),
            Err(_) => Err(FabricError::RequestTimeout {
                subject: subject.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    fn admin(&self) -> Arc<dyn FabricAdmin> {
        Arc::new(InMemoryAdmin {
            shared: self.shared.clone(),
        })
    }

    async fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.subscribers.write().clear();
        debug!("Fabric closed");
    }
}

struct InMemoryAdmin {
    shared: Arc<Shared>,
}

impl InMemoryAdmin {
    fn snapshot(entry: &SubscriberEntry) -> ConsumerInfo {
        ConsumerInfo {
            consumer: entry.consumer.clone(),
            subject: entry.subject.clone(),
            pending: entry.counters.pending.load(Ordering::Acquire),
            delivered: entry.counters.delivered.load(Ordering::Acquire),
            acked: entry.counters.acked.load(Ordering::Acquire),
            redelivered: entry.counters.redelivered.load(Ordering::Acquire),
        }
    }
}

#[async_trait]
impl FabricAdmin for InMemoryAdmin {
    async fn consumer_info(&self, consumer: &str) -> Result<ConsumerInfo, FabricError> {
        let subscribers = self.shared.subscribers.read();
        subscribers
            .iter()
            .find(|entry| entry.consumer == consumer)
            .map(Self::snapshot)
            .ok_or(FabricError::NoResponders {
                subject: consumer.to_string(),
            })
    }

    async fn list_consumers(&self) -> Result<Vec<ConsumerInfo>, FabricError> {
        let subscribers = self.shared.subscribers.read();
        Ok(subscribers.iter().map(Self::snapshot).collect())
    }

    async fn stream_info(&self, subject: &str) -> Result<StreamInfo, FabricError> {
        let durable = self.shared.durable.read();
        let log = durable.get(subject);
        Ok(StreamInfo {
            subject: subject.to_string(),
            messages: log.map_or(0, |l| l.messages.len() as u64),
            bytes: log.map_or(0, |l| l.bytes),
        })
    }
}

fn validate_subject(subject: &str, allow_wildcards: bool) -> Result<(), FabricError> {
    if subject.is_empty() {
        return Err(FabricError::InvalidSubject {
            subject: subject.to_string(),
            detail: "empty subject".to_string(),
        });
    }

    let tokens: Vec<&str> = subject.split('.').collect();
    for (i, token) in tokens.iter().enumerate() {
        if token.is_empty() {
            return Err(FabricError::InvalidSubject {
                subject: subject.to_string(),
                detail: "empty token".to_string(),
            });
        }
        match *token {
            "*" if !allow_wildcards => {
                return Err(FabricError::InvalidSubject {
                    subject: subject.to_string(),
                    detail: "wildcard in publish subject".to_string(),
                });
            }
            ">" => {
                if !allow_wildcards {
                    return Err(FabricError::InvalidSubject {
                        subject: subject.to_string(),
                        detail: "wildcard in publish subject".to_string(),
                    });
                }
                if i != tokens.len() - 1 {
                    return Err(FabricError::InvalidSubject {
                        subject: subject.to_string(),
                        detail: "`>` must be the last token".to_string(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}
