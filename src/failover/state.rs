//! Failover state model.
//!
//! # States
//! - Healthy: the configured primary receives traffic
//! - Degraded: the active pool is suspect, confirmation pending
//! - FailedOver: traffic moved to the backup pool
//! - Recovering: primary looks good again, cool-down running
//!
//! # State Transitions
//! ```text
//! Healthy → Degraded: active pool health-down or high error ratio
//! Degraded → FailedOver: health-down (immediate) or sustained errors
//! FailedOver → Recovering: primary up and below threshold
//! Recovering → Healthy: cool-down elapsed, traffic swapped back
//! Recovering → FailedOver: primary regressed during cool-down
//! Recovering → Degraded: the active pool itself regressed
//! ```
//!
//! # Design Decisions
//! - Confirmation and cool-down windows prevent flapping
//! - State changes logged and alerted for observability
//! - A health-down signal always outranks the sampled error ratio

use std::time::Instant;

use serde::Serialize;

/// Identity of one of the two fixed pools.
///
/// `Primary` and `Backup` are configured designations that never change at
/// runtime; which of the two currently receives traffic is tracked
/// separately by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolId {
    Primary,
    Backup,
}

impl PoolId {
    /// The other pool of the pair.
    pub fn other(self) -> PoolId {
        match self {
            PoolId::Primary => PoolId::Backup,
            PoolId::Backup => PoolId::Primary,
        }
    }

    pub fn role(self) -> &'static str {
        match self {
            PoolId::Primary => "primary",
            PoolId::Backup => "backup",
        }
    }
}

/// Why a pool was judged degraded.
///
/// When both signals fire on the same evaluation tick, `HealthDown` wins:
/// an unreachable pool is a stronger signal than a sampled error ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cause {
    HealthDown { consecutive_failures: u32 },
    HighErrorRate { ratio: f64, samples: usize },
}

impl Cause {
    /// Human-readable cause, used as the alert `detail` so operators (and
    /// tests) can attribute a failover to the signal that triggered it.
    pub fn describe(&self) -> String {
        match self {
            Cause::HealthDown {
                consecutive_failures,
            } => format!(
                "health check failed ({consecutive_failures} consecutive)"
            ),
            Cause::HighErrorRate { ratio, samples } => format!(
                "error ratio {:.2}% over {} samples",
                ratio * 100.0,
                samples
            ),
        }
    }

    pub fn is_health(&self) -> bool {
        matches!(self, Cause::HealthDown { .. })
    }
}

/// Current phase of the failover machine. Timing data lives in the
/// variants; `Instant` drives the logic so tests can inject clocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Healthy,
    Degraded { since: Instant, cause: Cause },
    FailedOver { since: Instant },
    Recovering { since: Instant },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Healthy => "healthy",
            Phase::Degraded { .. } => "degraded",
            Phase::FailedOver { .. } => "failed_over",
            Phase::Recovering { .. } => "recovering",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_swaps_identity() {
        assert_eq!(PoolId::Primary.other(), PoolId::Backup);
        assert_eq!(PoolId::Backup.other(), PoolId::Primary);
    }

    #[test]
    fn cause_describes_trigger() {
        let health = Cause::HealthDown {
            consecutive_failures: 1,
        };
        assert!(health.describe().contains("health check failed"));
        assert!(health.is_health());

        let errors = Cause::HighErrorRate {
            ratio: 0.025,
            samples: 200,
        };
        assert!(errors.describe().contains("2.50%"));
        assert!(!errors.is_health());
    }
}
