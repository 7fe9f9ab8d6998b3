//! Resilience helpers.
//!
//! # Design Decisions
//! - Transient I/O failures (log tail reads, reopen attempts) retry with
//!   jittered exponential backoff and are never fatal
//! - Health probe timeouts are handled where they occur; a timed-out
//!   probe is a data point, not a retryable error

pub mod backoff;
