//! Per-pool sliding windows over recent request outcomes.

use std::collections::VecDeque;

use crate::failover::PoolId;
use crate::source::parser::{RequestOutcome, StatusClass};

/// Fixed-capacity ring of the most recent outcomes for one pool.
///
/// Insertion at capacity evicts the oldest entry. The error count is
/// maintained incrementally so the ratio is O(1).
#[derive(Debug)]
pub struct SlidingWindow {
    entries: VecDeque<StatusClass>,
    capacity: usize,
    errors: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            errors: 0,
        }
    }

    /// Append an outcome, evicting the oldest if at capacity.
    pub fn record(&mut self, status: StatusClass) {
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                if evicted == StatusClass::ServerError {
                    self.errors -= 1;
                }
            }
        }
        if status == StatusClass::ServerError {
            self.errors += 1;
        }
        self.entries.push_back(status);
    }

    /// Rolling error ratio in [0, 1]. An empty window reports 0: no
    /// evidence of errors without traffic.
    pub fn error_ratio(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.errors as f64 / self.entries.len() as f64
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Once a pool stops receiving traffic its window
    /// would otherwise freeze at whatever ratio it had when traffic
    /// moved away.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.errors = 0;
    }

    /// Shrink or grow the capacity in place, evicting oldest entries as
    /// needed. Used when tunables are hot-reloaded.
    pub fn set_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        while self.entries.len() > capacity {
            if let Some(evicted) = self.entries.pop_front() {
                if evicted == StatusClass::ServerError {
                    self.errors -= 1;
                }
            }
        }
        self.capacity = capacity;
    }
}

/// The error ratio is only trusted once enough samples have accumulated.
pub fn ratio_is_high(ratio: f64, samples: usize, threshold: f64, min_samples: usize) -> bool {
    samples >= min_samples && ratio > threshold
}

/// Holds both pools' windows and tracks the pool label observed on the
/// most recent outcome (the proxy's actual routing, as seen in the log).
#[derive(Debug)]
pub struct WindowEvaluator {
    primary: SlidingWindow,
    backup: SlidingWindow,
    observed_pool: Option<PoolId>,
}

impl WindowEvaluator {
    pub fn new(capacity: usize) -> Self {
        Self {
            primary: SlidingWindow::new(capacity),
            backup: SlidingWindow::new(capacity),
            observed_pool: None,
        }
    }

    /// Record an outcome into its pool's window.
    pub fn record(&mut self, outcome: &RequestOutcome) {
        self.window_mut(outcome.pool).record(outcome.status);

        if self.observed_pool != Some(outcome.pool) {
            if let Some(previous) = self.observed_pool {
                tracing::info!(
                    from = previous.role(),
                    to = outcome.pool.role(),
                    "Serving pool changed in access log"
                );
            }
            self.observed_pool = Some(outcome.pool);
        }
    }

    pub fn error_ratio(&self, pool: PoolId) -> f64 {
        self.window(pool).error_ratio()
    }

    pub fn samples(&self, pool: PoolId) -> usize {
        self.window(pool).len()
    }

    /// The pool serving the most recently observed request, if any
    /// traffic has been seen yet.
    pub fn observed_pool(&self) -> Option<PoolId> {
        self.observed_pool
    }

    /// Restart one pool's window. Called when traffic is swapped away
    /// from a pool: the stale sample must neither block nor fake its
    /// recovery judgement.
    pub fn reset(&mut self, pool: PoolId) {
        self.window_mut(pool).clear();
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.primary.set_capacity(capacity);
        self.backup.set_capacity(capacity);
    }

    fn window(&self, pool: PoolId) -> &SlidingWindow {
        match pool {
            PoolId::Primary => &self.primary,
            PoolId::Backup => &self.backup,
        }
    }

    fn window_mut(&mut self, pool: PoolId) -> &mut SlidingWindow {
        match pool {
            PoolId::Primary => &mut self.primary,
            PoolId::Backup => &mut self.backup,
        }
    }
}
