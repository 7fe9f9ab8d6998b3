//! Log/health source adapter.
//!
//! # Data Flow
//! ```text
//! proxy access log (structured lines)
//!     → tail.rs (follow from end, survive rotation, backoff on errors)
//!     → parser.rs (line → RequestOutcome, unknown pools skipped)
//!     → buffer.rs (bounded, drop-oldest)
//!     → drained by the evaluation tick
//!
//! pool /healthz endpoints
//!     → health::probe (bounded-timeout GET, failures are data)
//! ```
//!
//! # Design Decisions
//! - The tailer is an independent producer; it never blocks the tick
//! - Read failures retry with jittered backoff, the stream never ends
//! - Freshness over completeness: a full buffer evicts oldest outcomes

pub mod buffer;
pub mod parser;
pub mod tail;

pub use buffer::OutcomeBuffer;
pub use parser::{LogParser, RequestOutcome, StatusClass};
pub use tail::LogTailer;
