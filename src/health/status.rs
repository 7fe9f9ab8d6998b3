//! Per-pool health state from consecutive probe results.

use std::time::{Duration, Instant};

/// Tracks one pool's probe history and up/down state.
///
/// `is_up` flips to false after `max_fails` consecutive failed checks,
/// where failures further apart than `fail_timeout` do not count as
/// consecutive. A single successful check flips it back up.
#[derive(Debug)]
pub struct HealthStatus {
    is_up: bool,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    last_check_at: Option<Instant>,
    max_fails: u32,
    fail_timeout: Duration,
}

impl HealthStatus {
    pub fn new(max_fails: u32, fail_timeout: Duration) -> Self {
        Self {
            // Optimistic start: an unprobed pool is assumed up so a
            // watcher restart cannot trigger a failover by itself.
            is_up: true,
            consecutive_failures: 0,
            last_failure_at: None,
            last_check_at: None,
            max_fails: max_fails.max(1),
            fail_timeout,
        }
    }

    /// Record one probe result. Returns the up/down state after it.
    pub fn record(&mut self, ok: bool, now: Instant) -> bool {
        self.last_check_at = Some(now);

        if ok {
            self.consecutive_failures = 0;
            self.last_failure_at = None;
            if !self.is_up {
                tracing::info!("Pool health recovered");
            }
            self.is_up = true;
        } else {
            self.consecutive_failures = match self.last_failure_at {
                Some(previous) if now.duration_since(previous) <= self.fail_timeout => {
                    self.consecutive_failures + 1
                }
                _ => 1,
            };
            self.last_failure_at = Some(now);

            if self.consecutive_failures >= self.max_fails && self.is_up {
                tracing::warn!(
                    failures = self.consecutive_failures,
                    threshold = self.max_fails,
                    "Pool marked down"
                );
                self.is_up = false;
            }
        }

        self.is_up
    }

    pub fn is_up(&self) -> bool {
        self.is_up
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_check_at(&self) -> Option<Instant> {
        self.last_check_at
    }

    /// Apply hot-reloaded thresholds.
    pub fn set_thresholds(&mut self, max_fails: u32, fail_timeout: Duration) {
        self.max_fails = max_fails.max(1);
        self.fail_timeout = fail_timeout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn single_failure_flips_down_with_max_fails_one() {
        let mut status = HealthStatus::new(1, secs(3));
        assert!(status.is_up());

        let now = Instant::now();
        assert!(!status.record(false, now));
        assert!(!status.is_up());
        assert_eq!(status.consecutive_failures(), 1);
    }

    #[test]
    fn success_recovers_immediately() {
        let mut status = HealthStatus::new(1, secs(3));
        let now = Instant::now();
        status.record(false, now);
        assert!(!status.is_up());

        assert!(status.record(true, now + secs(1)));
        assert!(status.is_up());
        assert_eq!(status.consecutive_failures(), 0);
    }

    #[test]
    fn failures_outside_fail_timeout_are_not_consecutive() {
        let mut status = HealthStatus::new(2, secs(3));
        let now = Instant::now();

        status.record(false, now);
        assert_eq!(status.consecutive_failures(), 1);
        assert!(status.is_up());

        // 5s later: beyond the 3s fail timeout, count restarts at 1.
        status.record(false, now + secs(5));
        assert_eq!(status.consecutive_failures(), 1);
        assert!(status.is_up());

        // 1s later: within the timeout, count reaches the threshold.
        status.record(false, now + secs(6));
        assert_eq!(status.consecutive_failures(), 2);
        assert!(!status.is_up());
    }

    #[test]
    fn stays_down_while_failures_continue() {
        let mut status = HealthStatus::new(1, secs(3));
        let now = Instant::now();
        status.record(false, now);
        status.record(false, now + secs(1));
        assert!(!status.is_up());
        assert_eq!(status.consecutive_failures(), 2);
    }
}
