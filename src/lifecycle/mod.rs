//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Initialize subsystems → Start tasks
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → tasks drain and exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - In-flight health probes drain up to their timeout, never aborted

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
