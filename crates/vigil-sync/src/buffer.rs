//! Bounded, ordered, deduplicated storage for one telemetry stream.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use vigil_protocols::StreamRecord;

/// Position of an entry in the buffer.
///
/// Entries without a backend sequence sort by timestamp; `arrival` breaks
/// remaining ties and is kept for the lifetime of the entry, so re-applying
/// a batch never reorders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    sequence: Option<u64>,
    timestamp: DateTime<Utc>,
    arrival: u64,
}

/// A bounded buffer of stream records.
///
/// Invariants:
/// - `len() <= capacity()`
/// - no two entries share a `record_id`
/// - iteration is ascending by `(sequence, timestamp, arrival)`
#[derive(Debug, Clone)]
pub struct StreamBuffer<T: StreamRecord> {
    capacity: usize,
    entries: BTreeMap<OrderKey, T>,
    index: HashMap<String, OrderKey>,
    next_arrival: u64,
}

impl<T: StreamRecord> StreamBuffer<T> {
    /// Create an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: BTreeMap::new(),
            index: HashMap::new(),
            next_arrival: 0,
        }
    }

    /// Insert or update entries. Returns whether the buffer content changed.
    ///
    /// An entry whose id is present with an identical payload is a no-op.
    /// A different payload replaces the entry; it only moves if its ordering
    /// fields changed. New entries that immediately fall off the bottom of a
    /// full buffer do not count as a change.
    pub fn upsert<I>(&mut self, entries: I) -> bool
    where
        I: IntoIterator<Item = T>,
    {
        let mut changed = false;
        for entry in entries {
            changed |= self.upsert_one(entry);
        }
        changed
    }

    fn upsert_one(&mut self, entry: T) -> bool {
        let id = entry.record_id();

        if let Some(&key) = self.index.get(&id) {
            if self.entries.get(&key) == Some(&entry) {
                return false;
            }

            let new_key = OrderKey {
                sequence: entry.sequence(),
                timestamp: entry.timestamp(),
                arrival: key.arrival,
            };
            if new_key != key {
                self.entries.remove(&key);
                self.index.insert(id, new_key);
            }
            self.entries.insert(new_key, entry);
            return true;
        }

        let key = OrderKey {
            sequence: entry.sequence(),
            timestamp: entry.timestamp(),
            arrival: self.next_arrival,
        };
        self.next_arrival += 1;
        self.entries.insert(key, entry);
        self.index.insert(id.clone(), key);

        let evicted = self.evict_overflow_ids();
        !(evicted.len() == 1 && evicted[0] == id)
    }

    /// Drop the oldest entries until the buffer fits its capacity.
    /// Returns the number of evicted entries.
    pub fn evict_overflow(&mut self) -> usize {
        self.evict_overflow_ids().len()
    }

    fn evict_overflow_ids(&mut self) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            match self.entries.pop_first() {
                Some((_, entry)) => {
                    let id = entry.record_id();
                    self.index.remove(&id);
                    evicted.push(id);
                }
                None => break,
            }
        }
        evicted
    }

    /// Entries in ascending order. With a limit, only the newest `limit`
    /// entries are returned, still ascending.
    pub fn snapshot(&self, limit: Option<usize>) -> Vec<&T> {
        let skip = match limit {
            Some(limit) => self.entries.len().saturating_sub(limit),
            None => 0,
        };
        self.entries.values().skip(skip).collect()
    }

    /// Ascending iterator over all entries.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.values()
    }

    /// The newest entry.
    pub fn latest(&self) -> Option<&T> {
        self.entries.values().next_back()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).and_then(|key| self.entries.get(key))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Remove an entry by id.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let key = self.index.remove(id)?;
        self.entries.remove(&key)
    }

    /// Keep only the entries whose id satisfies `keep`. Returns the removed count.
    pub fn retain_ids<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let doomed: Vec<String> = self
            .index
            .keys()
            .filter(|id| !keep(id))
            .cloned()
            .collect();
        for id in &doomed {
            self.remove(id);
        }
        doomed.len()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.values().map(|e| e.record_id()).collect()
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

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
