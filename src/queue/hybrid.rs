//! Bounded in-memory FIFO with overflow to durable storage

use crate::storage::OverflowStore;
use std::collections::VecDeque;

/// FIFO queue that keeps at most `capacity` elements in memory
///
/// When memory fills up the queue enters overflow mode and appends new
/// elements to the overflow store instead. Dequeuing refills memory from the
/// store once memory drops to a tenth of the capacity, and overflow mode ends
/// once memory is below half the capacity. The gap between the two thresholds
/// keeps the queue from flipping modes on every call under bursty load.
///
/// Storage failures are logged and never returned: a failed write drops the
/// element, a failed read ends the current refill.
pub struct HybridQueue<T> {
    memory: VecDeque<T>,
    capacity: usize,
    overflow: Option<Box<dyn OverflowStore<T>>>,
    /// Elements held by the overflow store, tracked locally
    overflow_len: usize,
    overflow_mode: bool,
}

impl<T> HybridQueue<T> {
    /// Creates a memory-only queue that never overflows
    pub fn unbounded() -> Self {
        Self {
            memory: VecDeque::new(),
            capacity: usize::MAX,
            overflow: None,
            overflow_len: 0,
            overflow_mode: false,
        }
    }

    /// Creates a queue holding up to `capacity` elements in memory
    ///
    /// # Arguments
    ///
    /// * `capacity` - In-memory limit, at least 1
    /// * `store` - Destination of elements beyond the limit; must start empty
    pub fn with_overflow(capacity: usize, store: Box<dyn OverflowStore<T>>) -> Self {
        let capacity = capacity.max(1);
        Self {
            memory: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            overflow: Some(store),
            overflow_len: 0,
            overflow_mode: false,
        }
    }

    /// Appends an element at the tail
    pub fn enqueue(&mut self, element: T) {
        if self.overflow.is_some() && (self.overflow_mode || self.memory.len() >= self.capacity) {
            if !self.overflow_mode {
                tracing::debug!(
                    "Queue reached {} in-memory elements, switching to overflow mode",
                    self.capacity
                );
                self.overflow_mode = true;
            }
            self.spill(element);
        } else {
            self.memory.push_back(element);
        }
    }

    /// Appends a low-priority element
    ///
    /// Goes straight to the overflow store when there is one, so it is served
    /// after everything already in memory.
    pub fn defer_insert(&mut self, element: T) {
        if self.overflow.is_some() {
            self.spill(element);
        } else {
            self.memory.push_back(element);
        }
    }

    /// Removes and returns the head element
    pub fn dequeue(&mut self) -> Option<T> {
        if self.memory.is_empty() {
            self.refill();
        }

        let element = self.memory.pop_front()?;

        if self.memory.len() <= self.capacity / 10 {
            self.refill();
        }

        if self.overflow_mode && self.memory.len() < self.capacity / 2 {
            tracing::debug!(
                "Queue down to {} in-memory elements, leaving overflow mode",
                self.memory.len()
            );
            self.overflow_mode = false;
        }

        Some(element)
    }

    /// Total elements, in memory and in the overflow store
    pub fn len(&self) -> usize {
        self.memory.len() + self.overflow_len
    }

    /// Returns true if no element is queued anywhere
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements currently held in memory
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Elements currently held by the overflow store
    pub fn overflow_len(&self) -> usize {
        self.overflow_len
    }

    /// Returns true while new elements are routed to the overflow store
    pub fn is_overflow_mode(&self) -> bool {
        self.overflow_mode
    }

    fn spill(&mut self, element: T) {
        let Some(store) = self.overflow.as_mut() else {
            self.memory.push_back(element);
            return;
        };

        match store.push(&element) {
            Ok(sequence_id) => {
                self.overflow_len += 1;
                tracing::trace!("Spilled element {} to overflow store", sequence_id);
            }
            Err(e) => {
                tracing::warn!("Dropping queued element, overflow store write failed: {}", e);
            }
        }
    }

    /// Moves the oldest stored elements into memory until memory is full
    fn refill(&mut self) {
        let Some(store) = self.overflow.as_mut() else {
            return;
        };

        let mut moved = 0usize;
        while self.overflow_len > 0 && self.memory.len() < self.capacity {
            match store.pop_oldest() {
                Ok(Some(element)) => {
                    self.memory.push_back(element);
                    self.overflow_len -= 1;
                    moved += 1;
                }
                Ok(None) => {
                    self.overflow_len = 0;
                }
                Err(e) => {
                    tracing::warn!("Overflow store read failed: {}", e);
                    // A record that cannot be read has been consumed all the same
                    self.overflow_len = store
                        .len()
                        .unwrap_or(self.overflow_len.saturating_sub(1));
                    break;
                }
            }
        }

        if moved > 0 {
            tracing::debug!(
                "Refilled {} elements from overflow store, {} remain stored",
                moved,
                self.overflow_len
            );
        }
    }
}
