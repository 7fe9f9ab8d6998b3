//! Failover decision subsystem.
//!
//! # Data Flow
//! ```text
//! Tick snapshot (health status + window ratios, both pools)
//!     → machine.rs (one synchronous evaluation step)
//!     → transitions (state.rs) with confirmation / cool-down timing
//!     → actions: alerts to emit, pool swaps to issue
//! ```
//!
//! # Design Decisions
//! - The machine is pure logic: the clock is an argument, effects are
//!   returned, I/O lives in the engine — transitions stay unit-testable
//! - One evaluation per tick against the combined snapshot; the machine
//!   never acts on a single outcome in isolation
//! - A health-down signal outranks the error ratio on the same tick

pub mod machine;
pub mod state;

pub use machine::{Action, FailoverMachine, PoolNames, PoolSnapshot, Thresholds, TickSnapshot};
pub use state::{Cause, Phase, PoolId};
