//! # Mesh Crypto - Identity and Event Authentication
//!
//! Per-node Ed25519 keypairs, per-event signatures over a canonical byte
//! encoding, and payload digests.
//!
//! ## Security Properties
//!
//! - Deterministic nonces (no RNG dependency at sign time)
//! - Constant-time verification, immune to timing side channels
//! - Canonical encoding: a signature computed by one implementation
//!   verifies on any other, regardless of map ordering
//! - Secret key material zeroized on drop

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod canonical;
pub mod errors;
pub mod hashing;
pub mod identity;
pub mod keypair;

pub use canonical::{canonical_bytes, sign_bytes, SignedSubset};
pub use errors::CryptoError;
pub use hashing::{content_digest, schema_fingerprint};
pub use identity::NodeIdentity;
pub use keypair::{KeyPair, PublicKey, Signature};
