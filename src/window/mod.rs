//! Sliding window evaluation subsystem.
//!
//! # Data Flow
//! ```text
//! RequestOutcome (from source)
//!     → sliding.rs (per-pool fixed-capacity ring)
//!     → rolling error ratio per pool
//!     → consumed by the failover state machine via the tick snapshot
//! ```
//!
//! # Design Decisions
//! - Window is per-pool; one pool's errors never dilute the other's ratio
//! - An empty window has ratio 0: silence is not degradation
//! - The ratio only counts once a minimum sample count has accumulated,
//!   so a cold window with a handful of requests cannot trip the alarm

pub mod sliding;

pub use sliding::{ratio_is_high, SlidingWindow, WindowEvaluator};
