//! The evaluation loop.
//!
//! # Data Flow
//! ```text
//! every tick (interval from config):
//!     drain outcome buffer → window evaluator
//!     probe both pools concurrently (bounded timeout each)
//!     build combined snapshot
//!     one failover machine step → actions
//!     execute actions (alerts, pool swaps)
//!     converge proxy routing (retries failed swap commands)
//!     publish status snapshot for the admin API
//! ```
//!
//! # Design Decisions
//! - Failover state is owned by the engine and only touched inside the
//!   tick: no concurrent transition execution, no partial-state reads
//! - The two probes are joined, never sequential: one slow pool cannot
//!   delay evaluation of the other
//! - Nothing in the tick blocks beyond the health-check timeout bound

pub mod runner;
pub mod snapshot;

pub use runner::Engine;
pub use snapshot::{PoolStatus, StatusSnapshot};
