//! The failover state machine.

use std::time::{Duration, Instant, SystemTime};

use crate::alert::{Alert, AlertKind, Severity};
use crate::config::WatcherConfig;
use crate::failover::state::{Cause, Phase, PoolId};
use crate::window::ratio_is_high;

/// Upper bound on transitions per evaluation. A health-down tick
/// legitimately cascades Healthy → Degraded → FailedOver; nothing valid
/// needs more than four steps.
const MAX_CASCADE: usize = 4;

/// Runtime mapping from pool identity to logical name.
#[derive(Debug, Clone)]
pub struct PoolNames {
    pub primary: String,
    pub backup: String,
}

impl PoolNames {
    pub fn name(&self, pool: PoolId) -> &str {
        match pool {
            PoolId::Primary => &self.primary,
            PoolId::Backup => &self.backup,
        }
    }
}

/// Decision thresholds, re-read from the live config every tick so hot
/// reloads apply without restarting.
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub error_ratio_threshold: f64,
    pub min_samples: usize,
    pub confirmation: Duration,
    pub cooldown: Duration,
}

impl Thresholds {
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self {
            error_ratio_threshold: config.window.error_ratio_threshold,
            min_samples: config.window.min_samples,
            confirmation: Duration::from_millis(config.failover.confirmation_ms),
            cooldown: Duration::from_secs(config.failover.cooldown_secs),
        }
    }
}

/// One pool's view in the combined tick snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PoolSnapshot {
    pub is_up: bool,
    pub consecutive_failures: u32,
    pub error_ratio: f64,
    pub samples: usize,
}

/// The combined snapshot the machine evaluates: latest health status and
/// window state for both pools, captured once per tick.
#[derive(Debug, Clone, Copy)]
pub struct TickSnapshot {
    pub primary: PoolSnapshot,
    pub backup: PoolSnapshot,
    pub observed_pool: Option<PoolId>,
}

impl TickSnapshot {
    pub fn pool(&self, id: PoolId) -> &PoolSnapshot {
        match id {
            PoolId::Primary => &self.primary,
            PoolId::Backup => &self.backup,
        }
    }
}

/// Side effect requested by a transition. Executed by the engine after
/// the evaluation step returns.
#[derive(Debug)]
pub enum Action {
    Emit(Alert),
    Swap(PoolId),
}

/// The failover decision engine.
///
/// Owns the process-wide failover state; the engine serializes all
/// access through the single evaluation tick. `Healthy` always means the
/// configured primary is active; `FailedOver` and `Recovering` always
/// mean the backup is.
pub struct FailoverMachine {
    phase: Phase,
    active: PoolId,
    names: PoolNames,
    since_wall: SystemTime,
}

impl FailoverMachine {
    pub fn new(names: PoolNames) -> Self {
        Self {
            phase: Phase::Healthy,
            active: PoolId::Primary,
            names,
            since_wall: SystemTime::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active(&self) -> PoolId {
        self.active
    }

    pub fn active_name(&self) -> &str {
        self.names.name(self.active)
    }

    pub fn names(&self) -> &PoolNames {
        &self.names
    }

    /// Wall-clock time of the last transition, for status reporting.
    pub fn since(&self) -> SystemTime {
        self.since_wall
    }

    /// Run one synchronous evaluation against the latest snapshot.
    ///
    /// Transitions cascade within the tick where the rules allow it
    /// (health-down goes straight through Degraded to FailedOver).
    pub fn evaluate(
        &mut self,
        snapshot: &TickSnapshot,
        thresholds: &Thresholds,
        now: Instant,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        for _ in 0..MAX_CASCADE {
            if !self.step(snapshot, thresholds, now, &mut actions) {
                break;
            }
        }
        actions
    }

    /// Attempt a single transition. Returns true if one fired.
    fn step(
        &mut self,
        snapshot: &TickSnapshot,
        thresholds: &Thresholds,
        now: Instant,
        actions: &mut Vec<Action>,
    ) -> bool {
        match self.phase {
            Phase::Healthy => match self.degradation(snapshot, thresholds, self.active) {
                Some(cause) => {
                    self.enter_degraded(cause, now, actions);
                    true
                }
                None => false,
            },

            Phase::Degraded { since, .. } => {
                match self.degradation(snapshot, thresholds, self.active) {
                    None => {
                        // The blip cleared before confirmation: back to the
                        // posture the degradation interrupted.
                        tracing::info!(
                            pool = %self.active_name(),
                            "Degradation cleared before confirmation, standing down"
                        );
                        self.settle(now);
                        true
                    }
                    // An unreachable pool skips the confirmation window.
                    Some(cause) if cause.is_health() => {
                        self.fail_over(cause, now, actions);
                        true
                    }
                    Some(cause) if now.duration_since(since) >= thresholds.confirmation => {
                        self.fail_over(cause, now, actions);
                        true
                    }
                    Some(_) => false,
                }
            }

            Phase::FailedOver { .. } => {
                let standby = self.active.other();
                if self.eligible(snapshot, thresholds, standby) {
                    tracing::info!(
                        pool = %self.names.name(standby),
                        cooldown = ?thresholds.cooldown,
                        "Abandoned pool looks healthy, starting recovery cool-down"
                    );
                    self.phase = Phase::Recovering { since: now };
                    self.since_wall = SystemTime::now();
                    true
                } else {
                    if let Some(cause) = self.degradation(snapshot, thresholds, self.active) {
                        tracing::warn!(
                            pool = %self.active_name(),
                            detail = %cause.describe(),
                            "Active pool degraded while failed over; no eligible pool to swap to"
                        );
                    }
                    false
                }
            }

            Phase::Recovering { since } => {
                // Regression on the pool actually serving traffic re-enters
                // Degraded; it is never silently ignored.
                if let Some(cause) = self.degradation(snapshot, thresholds, self.active) {
                    self.enter_degraded(cause, now, actions);
                    return true;
                }

                let standby = self.active.other();
                if !self.eligible(snapshot, thresholds, standby) {
                    tracing::warn!(
                        pool = %self.names.name(standby),
                        "Recovery aborted, pool regressed during cool-down"
                    );
                    self.phase = Phase::FailedOver { since: now };
                    self.since_wall = SystemTime::now();
                    true
                } else if now.duration_since(since) >= thresholds.cooldown {
                    let restored = standby;
                    self.active = restored;
                    self.since_wall = SystemTime::now();
                    self.phase = Phase::Healthy;
                    actions.push(Action::Swap(restored));
                    actions.push(Action::Emit(Alert::new(
                        AlertKind::FailoverRecovered,
                        Severity::High,
                        self.names.name(restored),
                        format!(
                            "sustained good health for {:?}, traffic restored to {}",
                            thresholds.cooldown,
                            self.names.name(restored)
                        ),
                    )));
                    tracing::info!(pool = %self.names.name(restored), "Recovery complete, traffic restored");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Degradation signal for one pool, health first: an unreachable pool
    /// is a stronger signal than a sampled error ratio.
    fn degradation(
        &self,
        snapshot: &TickSnapshot,
        thresholds: &Thresholds,
        pool: PoolId,
    ) -> Option<Cause> {
        let s = snapshot.pool(pool);
        if !s.is_up {
            return Some(Cause::HealthDown {
                consecutive_failures: s.consecutive_failures,
            });
        }
        if ratio_is_high(
            s.error_ratio,
            s.samples,
            thresholds.error_ratio_threshold,
            thresholds.min_samples,
        ) {
            return Some(Cause::HighErrorRate {
                ratio: s.error_ratio,
                samples: s.samples,
            });
        }
        None
    }

    /// Whether a pool is fit to receive traffic back.
    fn eligible(&self, snapshot: &TickSnapshot, thresholds: &Thresholds, pool: PoolId) -> bool {
        self.degradation(snapshot, thresholds, pool).is_none()
    }

    fn enter_degraded(&mut self, cause: Cause, now: Instant, actions: &mut Vec<Action>) {
        tracing::warn!(
            pool = %self.active_name(),
            detail = %cause.describe(),
            "Active pool degraded"
        );
        // Error-rate degradation alerts on entry, exactly once; a
        // health-down entry is logged only, the FailoverDetected alert
        // follows in the same tick.
        if let Cause::HighErrorRate { .. } = cause {
            actions.push(Action::Emit(Alert::new(
                AlertKind::HighErrorRate,
                Severity::Critical,
                self.active_name().to_string(),
                cause.describe(),
            )));
        }
        self.phase = Phase::Degraded { since: now, cause };
        self.since_wall = SystemTime::now();
    }

    fn fail_over(&mut self, cause: Cause, now: Instant, actions: &mut Vec<Action>) {
        let from = self.active;
        let target = self.active.other();
        self.active = target;
        self.since_wall = SystemTime::now();
        self.phase = if target == PoolId::Primary {
            // Fleeing back onto the configured primary is the recovered
            // posture, not a new outage.
            Phase::Healthy
        } else {
            Phase::FailedOver { since: now }
        };

        actions.push(Action::Swap(target));
        actions.push(Action::Emit(Alert::new(
            AlertKind::FailoverDetected,
            Severity::High,
            self.names.name(from).to_string(),
            format!(
                "failing over from {} to {}: {}",
                self.names.name(from),
                self.names.name(target),
                cause.describe()
            ),
        )));
        tracing::warn!(
            from = %self.names.name(from),
            to = %self.names.name(target),
            detail = %cause.describe(),
            "FAILOVER"
        );
    }

    /// Leave Degraded without failing over.
    fn settle(&mut self, now: Instant) {
        self.phase = if self.active == PoolId::Primary {
            Phase::Healthy
        } else {
            Phase::FailedOver { since: now }
        };
        self.since_wall = SystemTime::now();
    }
}
