//! Bounded rolling buffer of normalized records.
//!
//! Append at the tail, evict from the head once the capacity is exceeded.
//! Readers only ever get shared references; the owning
//! [`StreamController`](crate::controller::StreamController) is the single
//! writer.

use std::collections::VecDeque;

use serde::Serialize;

use crate::types::CsiRecord;

/// Default number of records retained.
pub const DEFAULT_CAPACITY: usize = 100;

/// Occupancy state of a [`RollingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    /// No records.
    Empty,
    /// Between 1 and `capacity` records.
    Filled,
}

/// FIFO record store with a fixed capacity.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    /// Stored records (oldest first).
    records: VecDeque<CsiRecord>,
    /// Maximum number of records to retain.
    capacity: usize,
}

impl RollingBuffer {
    /// Create a buffer holding at most `capacity` records (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Append a record, evicting from the head until `len() == capacity`.
    ///
    /// Returns the number of records evicted.
    pub fn push(&mut self, record: CsiRecord) -> usize {
        self.records.push_back(record);
        let mut evicted = 0;
        while self.records.len() > self.capacity {
            self.records.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Replace the whole contents, keeping the last `capacity` records.
    pub fn replace<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = CsiRecord>,
    {
        self.records.clear();
        for record in records {
            self.push(record);
        }
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Most recent record, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&CsiRecord> {
        self.records.back()
    }

    /// Iterate records oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CsiRecord> + ExactSizeIterator {
        self.records.iter()
    }

    /// Read-only view of all records in arrival order.
    #[must_use]
    pub fn view(&self) -> Vec<&CsiRecord> {
        self.records.iter().collect()
    }

    /// Current occupancy state.
    #[must_use]
    pub fn state(&self) -> BufferState {
        if self.records.is_empty() {
            BufferState::Empty
        } else {
            BufferState::Filled
        }
    }

    /// Number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum capacity of the buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RollingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<'a> IntoIterator for &'a RollingBuffer {
    type Item = &'a CsiRecord;
    type IntoIter = std::collections::vec_deque::Iter<'a, CsiRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_record(value: f64) -> CsiRecord {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        CsiRecord::new(ts, None, vec![value])
    }

    fn first_values(buffer: &RollingBuffer) -> Vec<f64> {
        buffer.iter().map(|r| r.subcarriers[0]).collect()
    }

    #[test]
    fn empty_buffer() {
        let buffer = RollingBuffer::new(10);
        assert!(buffer.is_empty());
        assert_eq!(buffer.state(), BufferState::Empty);
        assert!(buffer.latest().is_none());
    }

    #[test]
    fn push_transitions_to_filled() {
        let mut buffer = RollingBuffer::new(10);
        assert_eq!(buffer.push(make_record(1.0)), 0);
        assert_eq!(buffer.state(), BufferState::Filled);
        assert_eq!(buffer.latest().unwrap().subcarriers, vec![1.0]);
    }

    #[test]
    fn eviction_keeps_last_capacity_in_order() {
        let mut buffer = RollingBuffer::new(3);
        for i in 0..5 {
            buffer.push(make_record(f64::from(i)));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(first_values(&buffer), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn replace_keeps_tail() {
        let mut buffer = RollingBuffer::new(2);
        buffer.push(make_record(9.0));
        buffer.replace((0..4).map(|i| make_record(f64::from(i))));
        assert_eq!(first_values(&buffer), vec![2.0, 3.0]);
    }

    #[test]
    fn clear_returns_to_empty() {
        let mut buffer = RollingBuffer::new(2);
        buffer.push(make_record(1.0));
        buffer.clear();
        assert_eq!(buffer.state(), BufferState::Empty);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut buffer = RollingBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.push(make_record(1.0));
        buffer.push(make_record(2.0));
        assert_eq!(first_values(&buffer), vec![2.0]);
    }

    #[test]
    fn default_capacity_is_100() {
        assert_eq!(RollingBuffer::default().capacity(), DEFAULT_CAPACITY);
    }
}
