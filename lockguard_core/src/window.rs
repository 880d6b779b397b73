//! Fixed-capacity ring of the most recent accepted range readings.

use crate::config::MAX_SAMPLE_SIZE;

/// Ring buffer of the last `capacity` readings; the oldest is overwritten first.
///
/// Statistics are order-independent, so `as_slice` exposes storage order.
/// Use `iter_oldest_first` when arrival order matters.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    buf: Vec<i32>,
    capacity: usize,
    next: usize,
}

impl SampleWindow {
    /// A zero capacity is raised to 1. Storage grows on demand past
    /// `MAX_SAMPLE_SIZE`, so an unvalidated capacity cannot abort allocation.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: Vec::with_capacity(capacity.min(MAX_SAMPLE_SIZE)),
            capacity,
            next: 0,
        }
    }

    pub fn push(&mut self, value: i32) {
        if self.buf.len() < self.capacity {
            self.buf.push(value);
        } else {
            self.buf[self.next] = value;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.next = 0;
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter_oldest_first(&self) -> impl Iterator<Item = i32> + '_ {
        let split = if self.is_full() { self.next } else { 0 };
        let (newer, older) = self.buf.split_at(split);
        older.iter().chain(newer.iter()).copied()
    }
}
