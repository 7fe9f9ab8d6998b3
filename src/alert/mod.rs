//! Alert and command emission subsystem.
//!
//! # Data Flow
//! ```text
//! State machine transition
//!     → Alert (immutable event)
//!     → sink.rs Emitter (fan-out, spawned deliveries)
//!         → LogSink (always)
//!         → WebhookSink (when configured; cooldown + maintenance gate)
//!     → recent-alert ring (admin API)
//!
//! Pool swap decision
//!     → command.rs PoolSwapClient (idempotent POST to the proxy
//!       control surface; failures escalate and retry next tick)
//! ```
//!
//! # Design Decisions
//! - Delivery is at-least-once; duplicate suppression is per sink
//! - Delivery failures are logged, never retried synchronously, and
//!   never block the evaluation loop
//! - The swap command is idempotent: re-issuing the applied target is
//!   a no-op, not an error

pub mod command;
pub mod sink;

pub use command::{CommandError, PoolSwapClient};
pub use sink::{AlertSink, Emitter, LogSink, WebhookSink};

use std::time::SystemTime;

use serde::Serialize;
use uuid::Uuid;

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    FailoverDetected,
    HighErrorRate,
    FailoverRecovered,
    SwapCommandFailed,
}

impl AlertKind {
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::FailoverDetected => "failover_detected",
            AlertKind::HighErrorRate => "high_error_rate",
            AlertKind::FailoverRecovered => "failover_recovered",
            AlertKind::SwapCommandFailed => "swap_command_failed",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AlertKind::FailoverDetected => "Failover Detected",
            AlertKind::HighErrorRate => "High Error Rate",
            AlertKind::FailoverRecovered => "Failover Recovered",
            AlertKind::SwapCommandFailed => "Pool Swap Command Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Critical,
}

/// Operator-facing alert. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub kind: AlertKind,
    pub severity: Severity,
    /// Logical pool name the alert is about (e.g. "blue").
    pub pool: String,
    pub detail: String,
    pub emitted_at: SystemTime,
}

impl Alert {
    pub fn new(
        kind: AlertKind,
        severity: Severity,
        pool: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            pool: pool.into(),
            detail: detail.into(),
            emitted_at: SystemTime::now(),
        }
    }
}
