//! # Runtime Configuration
//!
//! Everything an embedder tunes, deserialisable from JSON with full
//! defaults so a bare `RuntimeConfig::default()` boots a working runtime.

use mesh_flow_balance::FlowBalanceConfig;
use mesh_types::Separator;
use serde::{Deserialize, Serialize};

/// Connection settings for an external fabric binding.
///
/// The in-process fabric ignores `servers`; external broker adapters
/// honour the full set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Broker endpoints.
    pub servers: Vec<String>,
    /// Optional username.
    pub user: Option<String>,
    /// Optional password.
    pub pass: Option<String>,
    /// Optional token credential.
    pub token: Option<String>,
    /// Connect/request timeout.
    pub timeout_ms: u64,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            user: None,
            pass: None,
            token: None,
            timeout_ms: 5_000,
        }
    }
}

/// Authentication enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When true, unsigned events are rejected at the authentication gate.
    pub enforced: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { enforced: true }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Fabric connection settings.
    pub fabric: FabricConfig,
    /// Route eligible subjects through the durable channel.
    pub enable_durable: EnableDurable,
    /// Flow-balance monitor settings.
    pub flow_balance: FlowBalanceConfig,
    /// Authentication enforcement.
    pub authentication: AuthConfig,
    /// The event-type separator, fixed for the runtime's lifetime.
    pub separator: Separator,
}

/// `enable_durable` defaults to true when the fabric supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnableDurable(pub bool);

impl Default for EnableDurable {
    fn default() -> Self {
        Self(true)
    }
}
