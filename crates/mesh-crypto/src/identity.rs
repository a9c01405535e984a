//! # Node Identity
//!
//! One identity per node for its lifetime: the node id, its keypair, and
//! when it was created. Public keys are distributable; the private key
//! never leaves the owning node (and is zeroized when the identity drops).

use crate::keypair::{KeyPair, PublicKey, Signature};
use chrono::{DateTime, Utc};
use mesh_types::NodeId;

/// Cryptographic identity of a node.
pub struct NodeIdentity {
    node_id: NodeId,
    key_pair: KeyPair,
    created_at: DateTime<Utc>,
    certificate: Option<String>,
}

impl NodeIdentity {
    /// Create a fresh identity with a newly generated keypair.
    #[must_use]
    pub fn generate(node_id: NodeId) -> Self {
        Self {
            node_id,
            key_pair: KeyPair::generate(),
            created_at: Utc::now(),
            certificate: None,
        }
    }

    /// Create an identity from a known seed. Used by tests and by embedders
    /// that persist node keys.
    #[must_use]
    pub fn from_seed(node_id: NodeId, seed: [u8; 32]) -> Self {
        Self {
            node_id,
            key_pair: KeyPair::from_seed(seed),
            created_at: Utc::now(),
            certificate: None,
        }
    }

    /// The owning node's id.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// The distributable public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.key_pair.public_key()
    }

    /// When this identity was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Optional certificate chain attached by an external authority.
    #[must_use]
    pub fn certificate(&self) -> Option<&str> {
        self.certificate.as_deref()
    }

    /// Attach a certificate.
    pub fn set_certificate(&mut self, certificate: impl Into<String>) {
        self.certificate = Some(certificate.into());
    }

    /// Sign a message with the node's private key.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.key_pair.sign(message)
    }
}

impl std::fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose key material through Debug.
        f.debug_struct("NodeIdentity")
            .field("node_id", &self.node_id)
            .field("created_at", &self.created_at)
            .field("has_certificate", &self.certificate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_signs_and_verifies() {
        let identity = NodeIdentity::generate(NodeId::new("a"));
        let signature = identity.sign(b"hello");
        assert!(identity.public_key().verify(b"hello", &signature).is_ok());
    }

    #[test]
    fn test_identities_are_distinct() {
        let a = NodeIdentity::generate(NodeId::new("a"));
        let b = NodeIdentity::generate(NodeId::new("b"));
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_debug_hides_keys() {
        let identity = NodeIdentity::generate(NodeId::new("a"));
        let rendered = format!("{identity:?}");
        assert!(rendered.contains("node_id"));
        assert!(!rendered.contains("key_pair"));
    }
}
