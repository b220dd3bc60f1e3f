//! Lock-free hand-off queues between pipeline stages
//!
//! Each queue connects exactly one producer thread with exactly one
//! consumer thread. Neither side ever blocks: `push` evicts the oldest
//! element when the queue is at capacity (the latency cap) and `try_pop`
//! returns `None` when it is empty (underrun).

use bytes::Bytes;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Soft-bounded FIFO with drop-oldest overflow
pub struct HandoffQueue<T> {
    queue: ArrayQueue<T>,
    dropped_count: AtomicUsize,
}

/// Jitter buffer: compressed packets in arrival order
pub type PacketQueue = HandoffQueue<Bytes>;

/// Playback buffer: decoded PCM samples
pub type SampleQueue = HandoffQueue<i16>;

impl<T> HandoffQueue<T> {
    /// Create a new queue holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            dropped_count: AtomicUsize::new(0),
        }
    }

    /// Append an item at the tail.
    /// Returns false if the oldest item had to be evicted to make room.
    pub fn push(&self, item: T) -> bool {
        match self.queue.force_push(item) {
            None => true,
            Some(_evicted) => {
                self.dropped_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Remove the head item, or None when empty
    pub fn try_pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Move queued items into the head of `out`, stopping at the first
    /// empty read. Returns how many positions were written.
    pub fn fill(&self, out: &mut [T]) -> usize {
        for (written, slot) in out.iter_mut().enumerate() {
            match self.queue.pop() {
                Some(item) => *slot = item,
                None => return written,
            }
        }
        out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Items evicted by the drop-oldest policy
    pub fn dropped_count(&self) -> usize {
        self.dropped_count.load(Ordering::Relaxed)
    }
}

impl<T: Copy> HandoffQueue<T> {
    /// Push every item of a frame in order.
    /// Returns the number of old items evicted to make room.
    pub fn push_slice(&self, items: &[T]) -> usize {
        items.iter().filter(|item| !self.push(**item)).count()
    }
}

/// Thread-safe handle to a hand-off queue
pub type SharedQueue<T> = Arc<HandoffQueue<T>>;

/// Create a new shared queue
pub fn create_shared_queue<T>(capacity: usize) -> SharedQueue<T> {
    Arc::new(HandoffQueue::new(capacity))
}
