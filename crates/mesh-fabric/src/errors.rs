//! # Error Types
//!
//! Transport-level failures. Publish failures surface to the emitter,
//! subscribe failures at registration, request failures to the requester.

use thiserror::Error;

/// Errors from fabric operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FabricError {
    /// The fabric is disconnected; publishes fail fast until reconnect.
    #[error("Fabric disconnected")]
    Disconnected,

    /// The fabric has been closed by shutdown.
    #[error("Fabric closed")]
    Closed,

    /// No subscriber is listening on the request subject.
    #[error("No responders on subject `{subject}`")]
    NoResponders { subject: String },

    /// The request deadline elapsed before a reply arrived.
    #[error("Request on subject `{subject}` timed out after {timeout_ms}ms")]
    RequestTimeout { subject: String, timeout_ms: u64 },

    /// An invalid subject was supplied (empty, or `>` not in tail position).
    #[error("Invalid subject `{subject}`: {detail}")]
    InvalidSubject { subject: String, detail: String },
}
