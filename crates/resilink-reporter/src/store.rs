//! Bounded in-memory error buffer
//!
//! Records wait here until a flush delivers them. The buffer keeps the most
//! recent `capacity` records and drops the oldest on overflow. Every record
//! carries a sequence number so a flush can acknowledge exactly what it
//! delivered, even if records were pushed or dropped while it was in flight.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use crate::record::ErrorRecord;

/// Default number of records kept before the oldest are dropped
pub const DEFAULT_STORE_CAPACITY: usize = 1000;

/// Snapshot of pending records and the sequence number of the last one
#[derive(Debug, Clone)]
pub struct PendingBatch {
    /// Records in capture order
    pub records: Vec<ErrorRecord>,
    /// Sequence number to pass to [`ErrorStore::acknowledge`]
    pub last_sequence: u64,
}

/// Store counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Records waiting for delivery
    pub pending: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Records pushed since creation
    pub recorded: u64,
    /// Records dropped on overflow since creation
    pub dropped: u64,
}

#[derive(Debug)]
struct StoreInner {
    entries: VecDeque<(u64, ErrorRecord)>,
    next_sequence: u64,
    dropped: u64,
}

/// Bounded, thread-safe error buffer
#[derive(Debug)]
pub struct ErrorStore {
    inner: Mutex<StoreInner>,
    capacity: usize,
}

impl Default for ErrorStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}

impl ErrorStore {
    /// Create a store holding at most `capacity` records (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(StoreInner {
                entries: VecDeque::with_capacity(capacity.min(DEFAULT_STORE_CAPACITY)),
                next_sequence: 0,
                dropped: 0,
            }),
            capacity,
        }
    }

    /// Append a record, dropping the oldest one when full
    pub fn push(&self, record: ErrorRecord) {
        let mut inner = self.inner.lock();
        if inner.entries.len() >= self.capacity {
            inner.entries.pop_front();
            inner.dropped += 1;
            if inner.dropped == 1 || inner.dropped % 100 == 0 {
                warn!(
                    capacity = self.capacity,
                    dropped = inner.dropped,
                    "Error store full, dropping oldest records"
                );
            }
        }
        inner.next_sequence += 1;
        let sequence = inner.next_sequence;
        inner.entries.push_back((sequence, record));
    }

    /// Copy of all pending records, or `None` when the store is empty
    pub fn pending(&self) -> Option<PendingBatch> {
        let inner = self.inner.lock();
        let last_sequence = inner.entries.back()?.0;
        Some(PendingBatch {
            records: inner.entries.iter().map(|(_, record)| record.clone()).collect(),
            last_sequence,
        })
    }

    /// Remove every record up to and including `last_sequence`
    pub fn acknowledge(&self, last_sequence: u64) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        while inner
            .entries
            .front()
            .is_some_and(|(sequence, _)| *sequence <= last_sequence)
        {
            inner.entries.pop_front();
        }
        before - inner.entries.len()
    }

    /// Copy of pending records in capture order
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Number of pending records
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Maximum number of pending records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard all pending records
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Current counters
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            pending: inner.entries.len(),
            capacity: self.capacity,
            recorded: inner.next_sequence,
            dropped: inner.dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ErrorKind;

    fn record(message: &str) -> ErrorRecord {
        ErrorRecord::new(ErrorKind::Unknown, message)
    }

    fn messages(store: &ErrorStore) -> Vec<String> {
        store.records().into_iter().map(|r| r.message).collect()
    }

    #[test]
    fn test_oldest_dropped_on_overflow() {
        let store = ErrorStore::new(3);
        for i in 0..5 {
            store.push(record(&format!("e{i}")));
        }

        assert_eq!(messages(&store), vec!["e2", "e3", "e4"]);
        let stats = store.stats();
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.recorded, 5);
        assert_eq!(stats.dropped, 2);
    }

    #[test]
    fn test_acknowledge_keeps_records_pushed_after_snapshot() {
        let store = ErrorStore::default();
        store.push(record("a"));
        store.push(record("b"));

        let batch = store.pending().unwrap();
        store.push(record("c"));

        assert_eq!(store.acknowledge(batch.last_sequence), 2);
        assert_eq!(messages(&store), vec!["c"]);
    }

    #[test]
    fn test_acknowledge_after_overflow_during_flush() {
        let store = ErrorStore::new(2);
        store.push(record("a"));
        store.push(record("b"));
        let batch = store.pending().unwrap();

        store.push(record("c"));
        assert_eq!(store.acknowledge(batch.last_sequence), 1);
        assert_eq!(messages(&store), vec!["c"]);
    }

    #[test]
    fn test_empty_store_has_no_pending_batch() {
        let store = ErrorStore::new(0);
        assert!(store.pending().is_none());
        assert_eq!(store.capacity(), 1);
        assert!(store.is_empty());
    }
}
