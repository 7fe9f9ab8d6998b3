//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Evaluation tick
//!     → probe.rs (bounded-timeout GET /healthz, one probe per pool,
//!       both pools probed concurrently)
//!     → status.rs (consecutive-failure tracking, up/down flips)
//!     → consumed by the failover state machine via the tick snapshot
//! ```
//!
//! # Design Decisions
//! - Probe failures are data, never errors raised to the caller
//! - Failures only count as consecutive within the fail timeout
//! - Pools start up: a watcher restart must not trigger a failover

pub mod probe;
pub mod status;

pub use probe::{HealthProber, ProbeOutcome};
pub use status::HealthStatus;
