//! # Health State Machine
//!
//! `Healthy → Degraded → Unhealthy`, driven by threshold assessments.
//! Escalation is immediate; recovery requires two consecutive samples at
//! the improved level (hysteresis), so a single quiet poll never clears an
//! incident.

use serde::{Deserialize, Serialize};

/// Derived health of a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for NodeHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        };
        f.write_str(name)
    }
}

/// Hysteresis wrapper around raw threshold assessments.
#[derive(Debug, Clone)]
pub struct HealthMachine {
    state: NodeHealth,
    improvement_streak: u32,
}

impl HealthMachine {
    /// Confirmations required before a recovery transition is taken.
    pub const RECOVERY_SAMPLES: u32 = 2;

    /// Start healthy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: NodeHealth::Healthy,
            improvement_streak: 0,
        }
    }

    /// Current confirmed state.
    #[must_use]
    pub fn state(&self) -> NodeHealth {
        self.state
    }

    /// Feed one raw assessment; returns the confirmed state after
    /// hysteresis.
    pub fn observe(&mut self, assessed: NodeHealth) -> NodeHealth {
        if assessed >= self.state {
            // Escalation (or no change) applies immediately.
            self.state = assessed;
            self.improvement_streak = 0;
        } else {
            self.improvement_streak += 1;
            if self.improvement_streak >= Self::RECOVERY_SAMPLES {
                self.state = assessed;
                self.improvement_streak = 0;
            }
        }
        self.state
    }
}

impl Default for HealthMachine {
    fn default() -> Self {
        Self::new()
    }
}
