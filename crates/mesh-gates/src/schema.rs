//! # Schema Registry
//!
//! Maps event types to expected payload fingerprints. Types without a
//! registered schema pass the gate; registered types must carry a matching
//! `causal.hash`.

use dashmap::DashMap;
use serde_json::Value;

/// Registered schema fingerprints by event type.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<String, String>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an expected fingerprint for an event type.
    pub fn register(&self, event_type: impl Into<String>, fingerprint: impl Into<String>) {
        self.schemas.insert(event_type.into(), fingerprint.into());
    }

    /// Register the fingerprint derived from an example payload.
    ///
    /// # Errors
    ///
    /// Propagates canonicalisation failures from the digest.
    pub fn register_example(
        &self,
        event_type: impl Into<String>,
        example_payload: &Value,
    ) -> Result<(), mesh_crypto::CryptoError> {
        let fingerprint = mesh_crypto::schema_fingerprint(example_payload)?;
        self.register(event_type, fingerprint);
        Ok(())
    }

    /// The registered fingerprint for a type, if any.
    #[must_use]
    pub fn fingerprint(&self, event_type: &str) -> Option<String> {
        self.schemas.get(event_type).map(|entry| entry.clone())
    }

    /// Remove a registration.
    pub fn unregister(&self, event_type: &str) -> Option<String> {
        self.schemas.remove(event_type).map(|(_, fp)| fp)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
