//! Bounded outcome buffer between the log tailer and the evaluation tick.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::source::parser::RequestOutcome;

/// Fixed-capacity FIFO shared by the tailer (producer) and the tick
/// (consumer). When full, the oldest unread outcome is evicted: the
/// evaluator needs a representative recent sample, not every request.
#[derive(Debug)]
pub struct OutcomeBuffer {
    inner: Mutex<VecDeque<RequestOutcome>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl OutcomeBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Append an outcome, evicting the oldest when at capacity.
    pub fn push(&self, outcome: RequestOutcome) {
        let mut queue = self.inner.lock().expect("outcome buffer mutex poisoned");
        if queue.len() == self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(outcome);
    }

    /// Take everything buffered since the last drain, in arrival order.
    pub fn drain(&self) -> Vec<RequestOutcome> {
        let mut queue = self.inner.lock().expect("outcome buffer mutex poisoned");
        queue.drain(..).collect()
    }

    /// Total outcomes evicted unread since startup.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
