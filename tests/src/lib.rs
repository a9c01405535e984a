//! # EventMesh Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Cross-crate runtime behaviour
//!     ├── scenarios.rs      # The end-to-end interaction scenarios
//!     ├── properties.rs     # Causality, signature, and round-trip laws
//!     └── flow_balance.rs   # Lag-driven detection over a live fabric
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p mesh-tests
//!
//! # By category
//! cargo test -p mesh-tests integration::scenarios::
//! cargo test -p mesh-tests integration::properties::
//!
//! # Benchmarks
//! cargo bench -p mesh-tests
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
