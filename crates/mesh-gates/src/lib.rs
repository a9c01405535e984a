//! # Mesh Gates - Security Pipeline
//!
//! Three gates evaluated in order for any event before business handlers:
//!
//! 1. **Authentication** — verify the Ed25519 signature over the canonical
//!    sign bytes using the event's own integrity section.
//! 2. **Schema** — compare the payload fingerprint against the registered
//!    schema for the event type.
//! 3. **Authorization** — consult the access policy; deny rules with lower
//!    priority values override allow rules.
//!
//! A rejected gate terminates the dispatch with a typed `SecurityError`.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod authz;
pub mod errors;
pub mod pipeline;
pub mod schema;

// Re-export main types
pub use authz::{AccessControl, AclRule, Effect};
pub use errors::{Gate, SecurityError};
pub use pipeline::GatePipeline;
pub use schema::SchemaRegistry;
