//! Published watcher status, served by the admin API.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// One pool's externally visible state.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub name: String,
    pub role: &'static str,
    pub is_up: bool,
    pub consecutive_failures: u32,
    pub error_ratio: f64,
    pub samples: usize,
}

/// Snapshot of the watcher published at the end of every evaluation
/// tick. Readers (admin API) only ever see a complete tick's view.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub phase: &'static str,
    pub active_pool: String,
    /// Wall-clock seconds of the last state transition.
    pub since_epoch_secs: u64,
    pub pools: Vec<PoolStatus>,
    /// Pool label seen on the most recent access log entry.
    pub observed_pool: Option<String>,
    /// Pool the control surface last confirmed as routed.
    pub routing_applied: Option<String>,
    /// Outcomes evicted unread from the buffer since startup.
    pub dropped_outcomes: u64,
}

impl StatusSnapshot {
    /// Placeholder published before the first tick completes.
    pub fn starting() -> Self {
        Self {
            phase: "starting",
            active_pool: String::new(),
            since_epoch_secs: epoch_secs(SystemTime::now()),
            pools: Vec::new(),
            observed_pool: None,
            routing_applied: None,
            dropped_outcomes: 0,
        }
    }
}

pub fn epoch_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
