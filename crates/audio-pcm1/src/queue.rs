//! The CPU-time edge queue: a single-producer/single-consumer ring of
//! timestamps at which the audio output bit flipped.
//!
//! Producer (CPU thread) pushes on every toggle; consumer (emission
//! thread) drains in FIFO order. Overflow drops the new edge; underflow
//! just means there is nothing pending. Neither is fatal — both are
//! logged, the same way `runner-lib`'s `AudioOutput` logs a stream error
//! via its callback instead of propagating one.

use ringbuf::traits::{Producer, Split};
use ringbuf::traits::Consumer as _;
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Producer half of the edge queue. Lives on the CPU thread.
pub struct EdgeProducer {
    inner: HeapProd<u64>,
    dropped: u64,
}

/// Consumer half of the edge queue. Lives on the emission thread.
///
/// Buffers at most one popped-but-not-yet-consumed edge so callers can
/// [`EdgeConsumer::peek`] the next timestamp before deciding whether to
/// drain it, without needing the underlying ring to support peeking.
pub struct EdgeConsumer {
    inner: HeapCons<u64>,
    pending: Option<u64>,
    starved: u64,
}

/// Build a queue of the given capacity (in edges), split into its
/// producer and consumer halves.
#[must_use]
pub fn edge_queue(capacity: usize) -> (EdgeProducer, EdgeConsumer) {
    let (prod, cons) = HeapRb::<u64>::new(capacity).split();
    (
        EdgeProducer { inner: prod, dropped: 0 },
        EdgeConsumer { inner: cons, pending: None, starved: 0 },
    )
}

impl EdgeProducer {
    /// Enqueue an edge at the given CPU time. Drops (and counts) the edge
    /// if the queue is full rather than blocking the CPU thread.
    pub fn push(&mut self, cpu_time: u64) {
        if self.inner.try_push(cpu_time).is_err() {
            self.dropped += 1;
            eprintln!(
                "audio-pcm1: edge queue full, dropping edge at t={cpu_time} (total dropped: {})",
                self.dropped
            );
        }
    }

    /// Total edges dropped so far due to a full queue.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl EdgeConsumer {
    /// Pop the next queued edge, if any, without logging (absence of an
    /// edge is the normal steady-state case, not an underflow).
    pub fn try_pop(&mut self) -> Option<u64> {
        if let Some(v) = self.pending.take() {
            return Some(v);
        }
        self.inner.try_pop()
    }

    /// Peek the next queued edge without consuming it.
    pub fn peek(&mut self) -> Option<u64> {
        if self.pending.is_none() {
            self.pending = self.inner.try_pop();
        }
        self.pending
    }

    /// Record that the emitter reached for an edge that did not exist
    /// (the held level was used instead). Logged, never fatal.
    pub fn note_underflow(&mut self) {
        self.starved += 1;
    }

    /// Total underflows observed so far.
    #[must_use]
    pub fn starved(&self) -> u64 {
        self.starved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_drain_in_fifo_order() {
        let (mut prod, mut cons) = edge_queue(4);
        prod.push(10);
        prod.push(20);
        prod.push(30);
        assert_eq!(cons.try_pop(), Some(10));
        assert_eq!(cons.try_pop(), Some(20));
        assert_eq!(cons.try_pop(), Some(30));
        assert_eq!(cons.try_pop(), None);
    }

    #[test]
    fn overflow_drops_newest_and_counts_it() {
        let (mut prod, mut cons) = edge_queue(2);
        prod.push(1);
        prod.push(2);
        prod.push(3); // dropped
        assert_eq!(prod.dropped(), 1);
        assert_eq!(cons.try_pop(), Some(1));
        assert_eq!(cons.try_pop(), Some(2));
        assert_eq!(cons.try_pop(), None);
    }
}
