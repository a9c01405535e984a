//! # Event Envelope
//!
//! The universal wrapper for everything that crosses the fabric.
//!
//! An event is the triple `{event_type, payload, context}`. The context
//! carries the causal metadata stamped at emit time, the optional end-to-end
//! origin, and the optional integrity section present on signed events.
//!
//! ## Security Properties
//!
//! - **Causal identity**: `causal.sender` is the sole source of truth for the
//!   immediate sender; `origin` survives forwarding unchanged.
//! - **Signing subset**: signatures cover exactly
//!   `{id, sender, timestamp, causation_id, correlation_id}` plus type and
//!   payload; the integrity section itself is never signed.

use crate::ids::{CorrelationId, EventId, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known metadata key carrying a signal-request token.
///
/// When present on an inbound event, the receiving node publishes a
/// synthetic `_signal.<token>` event once the handler continuum completes.
pub const SIGNAL_METADATA_KEY: &str = "signalOnCompletion";

/// Causal metadata assembled at emit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalContext {
    /// Unique id of this event.
    pub id: EventId,

    /// The emitting node. Always equal to `path[0]`.
    pub sender: NodeId,

    /// Wall-clock emit time in milliseconds since the Unix epoch.
    pub timestamp: u64,

    /// Ordered list of nodes the event has traversed, emitter first.
    pub path: Vec<NodeId>,

    /// Id of the directly-causing event, when emitted inside a handler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<EventId>,

    /// Groups every event of one interaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,

    /// Schema fingerprint of the payload (blake3, hex).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl CausalContext {
    /// Build a root causal context for a fresh emit (no causing event).
    #[must_use]
    pub fn root(sender: NodeId, timestamp: u64) -> Self {
        let id = EventId::generate();
        Self {
            correlation_id: Some(CorrelationId::from(&id)),
            id,
            sender: sender.clone(),
            timestamp,
            path: vec![sender],
            causation_id: None,
            hash: None,
        }
    }

    /// Build a causal context for an emit caused by an inbound event.
    ///
    /// `causation_id` is the inbound id; `correlation_id` is inherited from
    /// the inbound event, falling back to the inbound id itself.
    #[must_use]
    pub fn caused_by(sender: NodeId, timestamp: u64, inbound: &CausalContext) -> Self {
        Self {
            id: EventId::generate(),
            sender: sender.clone(),
            timestamp,
            path: vec![sender],
            causation_id: Some(inbound.id.clone()),
            correlation_id: Some(
                inbound
                    .correlation_id
                    .clone()
                    .unwrap_or_else(|| CorrelationId::from(&inbound.id)),
            ),
            hash: None,
        }
    }

    /// Record traversal of a forwarding node.
    pub fn append_hop(&mut self, node: NodeId) {
        self.path.push(node);
    }
}

/// End-to-end origin, independent of the immediate sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Identifier of the originating source.
    pub source_id: String,
    /// Kind of the originating source (e.g. `sensor`, `gateway`).
    pub source_type: String,
}

/// Integrity section present on authenticated events.
///
/// Both fields are url-safe base64 without padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integrity {
    /// Ed25519 signature over the canonical sign bytes.
    pub signature: String,
    /// The signer's public key.
    pub public_key: String,
}

/// Context carried by every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    /// Causal metadata stamped at emit time.
    pub causal: CausalContext,

    /// End-to-end origin, preserved unchanged across a continuum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,

    /// Present on signed events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<Integrity>,

    /// User-supplied extension fields, including signal-request tokens.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// An event flowing through the mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Dot- or hyphen-separated type identifier (e.g. `order.created`).
    pub event_type: String,

    /// Arbitrary structured payload.
    pub payload: Value,

    /// Causal, origin, integrity, and metadata sections.
    pub context: EventContext,
}

impl Event {
    /// The signal-request token, if the emitter asked for one.
    #[must_use]
    pub fn signal_token(&self) -> Option<&str> {
        self.context
            .metadata
            .get(SIGNAL_METADATA_KEY)
            .and_then(Value::as_str)
    }

    /// The immediate sender of this event.
    #[must_use]
    pub fn sender(&self) -> &NodeId {
        &self.context.causal.sender
    }

    /// Encode to the wire form.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode from the wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// The emit-side input: everything the caller controls.
///
/// The node fills in `causal` and `integrity` when the shell is emitted.
#[derive(Debug, Clone, Default)]
pub struct EventShell {
    /// Event type identifier.
    pub event_type: String,
    /// Payload; defaults to `null`.
    pub payload: Value,
    /// Extension metadata.
    pub metadata: Map<String, Value>,
    /// Explicit end-to-end origin.
    pub origin: Option<Origin>,
    /// Explicit correlation override for interaction grouping.
    pub correlation_id: Option<CorrelationId>,
}

impl EventShell {
    /// Create a shell for the given event type.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Self::default()
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Attach a metadata field.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Request a completion signal with the given token.
    #[must_use]
    pub fn with_signal(self, token: impl Into<String>) -> Self {
        self.with_metadata(SIGNAL_METADATA_KEY, Value::String(token.into()))
    }

    /// Attach an explicit origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Override the correlation id for interaction grouping.
    #[must_use]
    pub fn with_correlation(mut self, correlation: CorrelationId) -> Self {
        self.correlation_id = Some(correlation);
        self
    }
}
