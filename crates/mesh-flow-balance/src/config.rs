//! # Configuration
//!
//! Lag thresholds and polling cadence, with documented defaults. The
//! polling interval trades admin-surface load against detection staleness
//! and is deliberately left to the operator.

use serde::{Deserialize, Serialize};

/// Lag and rate thresholds driving pattern detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Below this lag a consumer counts as fully caught up.
    pub minor_lag: u64,
    /// Above this lag a consumer is degraded.
    pub moderate_lag: u64,
    /// Above this lag a consumer is severely degraded.
    pub severe_lag: u64,
    /// Above this lag with no progress the node is presumed down.
    pub critical_lag: u64,
    /// Maximum tolerated processing time per message, in milliseconds.
    pub max_processing_time_ms: u64,
    /// Minimum acknowledged/delivered ratio for a healthy consumer.
    pub min_ack_rate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            minor_lag: 10,
            moderate_lag: 50,
            severe_lag: 200,
            critical_lag: 500,
            max_processing_time_ms: 30_000,
            min_ack_rate: 0.8,
        }
    }
}

/// Monitor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowBalanceConfig {
    /// Whether the monitor runs at all.
    pub enabled: bool,
    /// Poll cadence against the fabric admin surface.
    pub polling_interval_ms: u64,
    /// Detection thresholds.
    pub thresholds: Thresholds,
}

impl Default for FlowBalanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            polling_interval_ms: 3_000,
            thresholds: Thresholds::default(),
        }
    }
}
