//! # Pending Responses
//!
//! Request/reply over a pub/sub fabric: a directed send registers a
//! one-shot slot keyed by its signal token; the receiver publishes a
//! `_signal.<token>` event when the continuum completes, and the signal
//! sink resolves the slot. Late responses after timeout or shutdown are
//! discarded.

use crate::errors::NodeError;
use dashmap::DashMap;
use mesh_continuum::LazySequence;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// The resolved outcome of a directed send.
#[derive(Debug)]
pub enum Reply {
    /// The remote continuum produced a final value.
    Value(Value),
    /// The remote continuum produced a lazy sequence (same-process sends).
    Stream(LazySequence),
    /// The remote continuum ended with no value.
    None,
}

impl Reply {
    /// The final value, when there is one.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Process-local hand-off for lazy sequences crossing a send boundary.
///
/// Streams cannot be serialised onto the fabric; within one process the
/// responder parks the sequence here under the signal token and the signal
/// event only carries a marker.
#[derive(Default)]
pub struct StreamHandoff {
    streams: DashMap<String, LazySequence>,
}

impl StreamHandoff {
    /// Create an empty hand-off table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a sequence under a token.
    pub fn park(&self, token: impl Into<String>, sequence: LazySequence) {
        self.streams.insert(token.into(), sequence);
    }

    /// Claim a parked sequence.
    pub fn claim(&self, token: &str) -> Option<LazySequence> {
        self.streams.remove(token).map(|(_, seq)| seq)
    }
}

type ReplySender = oneshot::Sender<Result<Reply, NodeError>>;

/// Open response slots keyed by signal token.
#[derive(Default)]
pub struct PendingResponses {
    slots: DashMap<String, ReplySender>,
}

impl PendingResponses {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slot for a token.
    pub fn open(&self, token: impl Into<String>) -> oneshot::Receiver<Result<Reply, NodeError>> {
        let (tx, rx) = oneshot::channel();
        self.slots.insert(token.into(), tx);
        rx
    }

    /// Whether a slot is open for this token.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.slots.contains_key(token)
    }

    /// Resolve a slot. Responses without an open slot are discarded.
    pub fn complete(&self, token: &str, reply: Result<Reply, NodeError>) {
        if let Some((_, sender)) = self.slots.remove(token) {
            // A dropped receiver (resolved timeout) discards the late reply.
            let _ = sender.send(reply);
        } else {
            debug!(token, "Response for unknown or expired token discarded");
        }
    }

    /// Remove a slot without resolving it (timeout path).
    pub fn discard(&self, token: &str) {
        self.slots.remove(token);
    }

    /// Cancel every open slot (shutdown path).
    pub fn cancel_all(&self) {
        let tokens: Vec<String> = self.slots.iter().map(|e| e.key().clone()).collect();
        for token in tokens {
            self.complete(&token, Err(NodeError::cancelled()));
        }
    }

    /// Number of open slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slots are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Handle to an in-flight directed send.
pub struct SendResult {
    token: String,
    receiver: oneshot::Receiver<Result<Reply, NodeError>>,
    pending: Arc<PendingResponses>,
}

impl SendResult {
    pub(crate) fn new(
        token: String,
        receiver: oneshot::Receiver<Result<Reply, NodeError>>,
        pending: Arc<PendingResponses>,
    ) -> Self {
        Self {
            token,
            receiver,
            pending,
        }
    }

    /// The signal token correlating this send with its reply.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Await the remote continuum's final result.
    ///
    /// # Errors
    ///
    /// `NodeError::Timeout` when the deadline elapses (the slot is removed
    /// and any late response is discarded); typed security or handler
    /// errors when the receiver rejected the event.
    pub async fn resolve(self, timeout: Duration) -> Result<Reply, NodeError> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(NodeError::cancelled()),
            Err(_) => {
                self.pending.discard(&self.token);
                Err(NodeError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Await and unwrap a value result; `None` and stream replies resolve
    /// to `Value::Null`.
    pub async fn resolve_value(self, timeout: Duration) -> Result<Value, NodeError> {
        Ok(match self.resolve(timeout).await? {
            Reply::Value(value) => value,
            Reply::Stream(_) | Reply::None => Value::Null,
        })
    }
}
