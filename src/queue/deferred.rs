//! Tasks waiting for a retry time

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// A task that becomes ready at `ready_at`
struct DeferredEntry<T> {
    ready_at: Instant,
    /// Insertion counter, breaks ties between equal ready times
    seq: u64,
    task: T,
}

// BinaryHeap is a max-heap; reverse so the earliest entry is on top
impl<T> Ord for DeferredEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .ready_at
            .cmp(&self.ready_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for DeferredEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for DeferredEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl<T> Eq for DeferredEntry<T> {}

/// Min-heap of deferred tasks ordered by ready time, then insertion order
pub struct DeferredTasks<T> {
    heap: BinaryHeap<DeferredEntry<T>>,
    next_seq: u64,
}

impl<T> DeferredTasks<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedules `task` to become ready `delay` after `now`
    pub fn push(&mut self, task: T, delay: Duration, now: Instant) {
        let entry = DeferredEntry {
            ready_at: now + delay,
            seq: self.next_seq,
            task,
        };
        self.next_seq += 1;
        self.heap.push(entry);
    }

    /// Removes and returns the earliest task if it is ready at `now`
    pub fn pop_ready(&mut self, now: Instant) -> Option<T> {
        if self.heap.peek()?.ready_at <= now {
            self.heap.pop().map(|entry| entry.task)
        } else {
            None
        }
    }

    /// Ready time of the earliest task
    pub fn next_ready_at(&self) -> Option<Instant> {
        self.heap.peek().map(|entry| entry.ready_at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for DeferredTasks<T> {
    fn default() -> Self {
        Self::new()
    }
}
