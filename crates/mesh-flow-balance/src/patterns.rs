//! # Pattern Detection
//!
//! Derives per-consumer flow metrics from raw admin counters and infers
//! failure patterns: a single stalled consumer is a node failure, a loaded
//! but progressing consumer is a bottleneck, a lagging cohort next to a
//! healthy cohort is a partition, and uniform degradation is overload.

use crate::config::Thresholds;
use crate::health::NodeHealth;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A processing rate this low counts as "no progress".
const STALLED_RATE: f64 = 0.01;

/// Detected failure pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowPattern {
    NodeFailure,
    Bottleneck,
    Partition,
    Overload,
}

impl std::fmt::Display for FlowPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NodeFailure => "node-failure",
            Self::Bottleneck => "bottleneck",
            Self::Partition => "partition",
            Self::Overload => "overload",
        };
        f.write_str(name)
    }
}

/// One derived sample for a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsumerSample {
    /// Messages waiting, net of acknowledgements.
    pub lag: u64,
    /// Deliveries per second since the previous sample.
    pub processing_rate: f64,
    /// Acknowledged / delivered ratio (1.0 when nothing was delivered).
    pub ack_rate: f64,
    /// Failed deliveries (redeliveries, full buffers).
    pub delivery_failures: u64,
    /// Sample wall-clock time, milliseconds.
    pub at: u64,
}

/// Raw threshold assessment of a single sample, before hysteresis.
#[must_use]
pub fn assess(sample: &ConsumerSample, thresholds: &Thresholds) -> NodeHealth {
    if sample.lag >= thresholds.critical_lag {
        return NodeHealth::Unhealthy;
    }
    if sample.lag >= thresholds.moderate_lag || sample.ack_rate < thresholds.min_ack_rate {
        return NodeHealth::Degraded;
    }
    NodeHealth::Healthy
}

/// Per-consumer pattern, judged over the sample window.
///
/// - node-failure: critical lag with no progress
/// - bottleneck: moderate lag, positive rate, lag not draining
#[must_use]
pub fn detect_consumer(
    history: &VecDeque<ConsumerSample>,
    thresholds: &Thresholds,
) -> Option<FlowPattern> {
    let latest = history.back()?;

    if latest.lag >= thresholds.critical_lag && latest.processing_rate < STALLED_RATE {
        return Some(FlowPattern::NodeFailure);
    }

    if latest.lag >= thresholds.moderate_lag
        && latest.processing_rate >= STALLED_RATE
        && lag_not_draining(history)
    {
        return Some(FlowPattern::Bottleneck);
    }

    None
}

/// Cohort pattern across all consumers.
///
/// - partition: a lagging cohort coexists with a healthy cohort
/// - overload: several consumers degraded with comparable lag, none healthy
#[must_use]
pub fn detect_system(
    latest: &[(String, ConsumerSample)],
    thresholds: &Thresholds,
) -> Option<(FlowPattern, Vec<String>, f64)> {
    if latest.len() < 2 {
        return None;
    }

    let lagging: Vec<&(String, ConsumerSample)> = latest
        .iter()
        .filter(|(_, s)| s.lag >= thresholds.moderate_lag)
        .collect();
    let healthy = latest
        .iter()
        .filter(|(_, s)| s.lag <= thresholds.minor_lag)
        .count();

    if lagging.len() < 2 {
        return None;
    }

    let affected: Vec<String> = lagging.iter().map(|(name, _)| name.clone()).collect();
    let share = lagging.len() as f64 / latest.len() as f64;

    if healthy > 0 {
        return Some((FlowPattern::Partition, affected, share));
    }

    let max_lag = lagging.iter().map(|(_, s)| s.lag).max().unwrap_or(0);
    let min_lag = lagging.iter().map(|(_, s)| s.lag).min().unwrap_or(0);
    if max_lag <= min_lag.saturating_mul(3).max(thresholds.moderate_lag) {
        return Some((FlowPattern::Overload, affected, share));
    }

    None
}

/// Whether lag held steady or grew across the most recent samples.
fn lag_not_draining(history: &VecDeque<ConsumerSample>) -> bool {
    let len = history.len();
    if len < 2 {
        return false;
    }
    let window = history.iter().skip(len.saturating_sub(3)).collect::<Vec<_>>();
    window.windows(2).all(|pair| pair[1].lag >= pair[0].lag)
}
