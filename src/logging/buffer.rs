//! This module provides a bounded buffer for storing log entries.
//!
//! The `RingBuffer` keeps the most recent entries in insertion order and
//! evicts the oldest first once it is full. Reading an entry does not extend
//! its lifetime.
use crate::types::{LogEntry, LogFilter};
use std::collections::VecDeque;

/// A bounded FIFO buffer of log entries.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    /// The entries, oldest first.
    entries: VecDeque<LogEntry>,
    /// The maximum number of entries to keep.
    capacity: usize,
}

impl RingBuffer {
    /// Creates a new, empty `RingBuffer`.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The maximum number of entries to store in the buffer.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Creates a buffer seeded with previously stored entries, keeping only the
    /// newest `capacity` of them.
    pub fn seeded(capacity: usize, entries: Vec<LogEntry>) -> Self {
        let mut buffer = Self::new(capacity);
        for entry in entries {
            buffer.append(entry);
        }
        buffer
    }

    /// Appends an entry, evicting from the front until within capacity.
    ///
    /// # Returns
    ///
    /// The number of entries evicted.
    pub fn append(&mut self, entry: LogEntry) -> usize {
        self.entries.push_back(entry);
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Returns a copy of the entries matching `filter`, in insertion order.
    pub fn query(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }

    /// Returns a copy of every entry.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Borrows the entries as one slice, oldest first.
    pub fn contiguous(&mut self) -> &[LogEntry] {
        self.entries.make_contiguous()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
