//! # Payload Digests
//!
//! BLAKE3 digests over the canonical encoding. Two flavours:
//!
//! - `content_digest` — digest of the full canonical payload bytes.
//! - `schema_fingerprint` — digest of the payload's *type skeleton* (sorted
//!   object keys plus value-kind tags). Two payloads with the same shape
//!   share a fingerprint regardless of their values, which is what the
//!   schema gate compares against its registry.

use crate::canonical::canonical_bytes;
use crate::CryptoError;
use serde_json::Value;

/// BLAKE3 digest of the canonical payload bytes, hex-encoded.
pub fn content_digest(payload: &Value) -> Result<String, CryptoError> {
    let bytes = canonical_bytes(payload)?;
    Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
}

/// BLAKE3 digest of the payload's type skeleton, hex-encoded.
///
/// Stable across runtimes: the skeleton is itself reduced to canonical
/// bytes before hashing.
pub fn schema_fingerprint(payload: &Value) -> Result<String, CryptoError> {
    let skeleton = type_skeleton(payload);
    let bytes = canonical_bytes(&skeleton)?;
    Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
}

/// Reduce a value to its shape: objects keep their keys, every leaf becomes
/// its kind tag, arrays keep element shapes in order.
fn type_skeleton(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut skeleton = serde_json::Map::new();
            for (key, inner) in map {
                skeleton.insert(key.clone(), type_skeleton(inner));
            }
            Value::Object(skeleton)
        }
        Value::Array(items) => Value::Array(items.iter().map(type_skeleton).collect()),
        Value::Null => Value::String("null".into()),
        Value::Bool(_) => Value::String("boolean".into()),
        Value::Number(_) => Value::String("number".into()),
        Value::String(_) => Value::String("string".into()),
    }
}
