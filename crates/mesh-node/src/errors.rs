//! # Error Types
//!
//! The error surface of the node API. Lower layers convert upward so the
//! embedder sees one enum at `on`/`emit`/`send`/`resolve`.

use mesh_crypto::CryptoError;
use mesh_fabric::FabricError;
use mesh_gates::SecurityError;
use mesh_pattern::PatternError;
use thiserror::Error;

/// Errors from node operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Operation on a node outside its usable lifecycle window.
    #[error("Lifecycle violation: {0}")]
    Lifecycle(String),

    /// A subscription expression failed to compile; the subscription is
    /// not installed.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A fabric-level failure surfaced to the caller.
    #[error(transparent)]
    Transport(#[from] FabricError),

    /// Canonicalisation or signature failure while stamping an emit.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A security gate rejected the event at the receiver.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// The handler chain at the receiver failed.
    #[error("Remote handler failed: {0}")]
    Handler(String),

    /// A pending response exceeded its deadline (or was cancelled by
    /// shutdown, which closes pending responses the same way).
    #[error("Response timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Event envelope could not be encoded or decoded.
    #[error("Codec failure: {0}")]
    Codec(String),
}

impl NodeError {
    /// The shutdown cancellation error: pending responses close with a
    /// zero-deadline timeout.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::Timeout { timeout_ms: 0 }
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}
