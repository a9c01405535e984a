//! # Canonical Byte Encoding
//!
//! The deterministic serialisation signatures are computed over: UTF-8 JSON
//! with recursively sorted object keys and arrays in insertion order.
//!
//! The signed metadata subset is exactly
//! `{id, sender, timestamp, causation_id, correlation_id}`; integrity and
//! accept-policy fields are excluded, so verifying a signature never
//! depends on fields added after signing.

use crate::CryptoError;
use mesh_types::{CausalContext, CorrelationId, EventId, NodeId};
use serde::Serialize;
use serde_json::Value;

/// The metadata subset included in signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSubset {
    pub id: EventId,
    pub sender: NodeId,
    pub timestamp: u64,
    pub causation_id: Option<EventId>,
    pub correlation_id: Option<CorrelationId>,
}

impl From<&CausalContext> for SignedSubset {
    fn from(causal: &CausalContext) -> Self {
        Self {
            id: causal.id.clone(),
            sender: causal.sender.clone(),
            timestamp: causal.timestamp,
            causation_id: causal.causation_id.clone(),
            correlation_id: causal.correlation_id.clone(),
        }
    }
}

/// Reduce any serialisable value to canonical bytes.
///
/// # Errors
///
/// `CryptoError::Canonicalisation` when the value cannot be represented as
/// JSON (cyclic or otherwise unserialisable data).
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let value =
        serde_json::to_value(value).map_err(|e| CryptoError::Canonicalisation(e.to_string()))?;
    let mut out = String::new();
    write_canonical(&value, &mut out)?;
    Ok(out.into_bytes())
}

/// The bit-exact sign-byte contract: UTF-8 JSON of
/// `{type, payload, metadata: <signed subset>}` with sorted keys.
pub fn sign_bytes(
    event_type: &str,
    payload: &Value,
    subset: &SignedSubset,
) -> Result<Vec<u8>, CryptoError> {
    let mut metadata = serde_json::Map::new();
    metadata.insert("id".into(), Value::String(subset.id.to_string()));
    metadata.insert("sender".into(), Value::String(subset.sender.to_string()));
    metadata.insert("timestamp".into(), Value::from(subset.timestamp));
    if let Some(causation) = &subset.causation_id {
        metadata.insert("causationId".into(), Value::String(causation.to_string()));
    }
    if let Some(correlation) = &subset.correlation_id {
        metadata.insert(
            "correlationId".into(),
            Value::String(correlation.to_string()),
        );
    }

    let mut envelope = serde_json::Map::new();
    envelope.insert("type".into(), Value::String(event_type.to_string()));
    envelope.insert("payload".into(), payload.clone());
    envelope.insert("metadata".into(), Value::Object(metadata));

    canonical_bytes(&Value::Object(envelope))
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), CryptoError> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_scalar(&Value::String((*key).clone()), out)?;
                out.push(':');
                write_canonical(&map[*key], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => write_scalar(scalar, out)?,
    }
    Ok(())
}

fn write_scalar(value: &Value, out: &mut String) -> Result<(), CryptoError> {
    let rendered =
        serde_json::to_string(value).map_err(|e| CryptoError::Canonicalisation(e.to_string()))?;
    out.push_str(&rendered);
    Ok(())
}
