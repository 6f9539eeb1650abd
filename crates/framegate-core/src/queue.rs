use std::collections::VecDeque;

/// One queued sample with its timestamp in stream microseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry<T> {
    pub sample: T,
    pub pts: i64,
}

/// Fixed-capacity FIFO that drops the oldest entry on overflow.
///
/// Newest entries sit at the front, oldest at the back. Eviction only ever
/// removes the back, so survivors keep their relative order.
#[derive(Debug)]
pub struct BoundedFrameQueue<T> {
    entries: VecDeque<QueueEntry<T>>,
    capacity: usize,
}

impl<T> BoundedFrameQueue<T> {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts at the front. Never blocks and never fails; when full, the
    /// oldest entry is evicted first and returned so the caller can count
    /// the drop.
    pub fn push(&mut self, sample: T, pts: i64) -> Option<QueueEntry<T>> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_back()
        } else {
            None
        };
        self.entries.push_front(QueueEntry { sample, pts });
        evicted
    }

    /// Removes and returns the oldest entry.
    pub fn pop(&mut self) -> Option<QueueEntry<T>> {
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every queued entry, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}
