//! # Error Types
//!
//! Failures from key handling, signing, verification, and canonicalisation.

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The bytes do not decode to a valid Ed25519 point.
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// A base64 field did not decode to the expected length.
    #[error("Invalid {field} encoding")]
    InvalidEncoding { field: &'static str },

    /// The signature did not verify against the message and key.
    #[error("Signature verification failed")]
    VerificationFailed,

    /// The value could not be reduced to canonical bytes.
    #[error("Canonicalisation failed: {0}")]
    Canonicalisation(String),
}
