/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! In-memory event log.
//!
//! This module provides the bounded ring the simulator records into. Once the
//! ring is full each append evicts exactly the oldest entry.

use crate::entry::EventLogEntry;
use crate::traits::EventStore;
use parking_lot::RwLock;
use plcsim_core::types::Direction;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Default number of retained entries.
pub const DEFAULT_LOG_CAPACITY: usize = 5000;

/// Default depth of the push subscription channel.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;

/// Telegram counters since creation or the last clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCounters {
    /// Inbound telegrams recorded.
    pub received: u64,
    /// Outbound telegrams recorded.
    pub sent: u64,
}

#[derive(Debug)]
struct Ring {
    entries: VecDeque<EventLogEntry>,
    next_index: u64,
}

/// Fixed-capacity in-memory event log.
///
/// Appends take a write lock so indices and arrival order always agree.
/// Every appended entry is also published to subscribers.
#[derive(Debug)]
pub struct MemoryEventLog {
    ring: RwLock<Ring>,
    capacity: usize,
    received: AtomicU64,
    sent: AtomicU64,
    notify: broadcast::Sender<EventLogEntry>,
}

impl MemoryEventLog {
    /// Creates a log retaining [`DEFAULT_LOG_CAPACITY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Creates a log retaining at most `capacity` entries (at least one).
    ///
    /// # Arguments
    /// * `capacity` - Maximum retained entries
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (notify, _) = broadcast::channel(DEFAULT_SUBSCRIBER_CAPACITY);
        Self {
            ring: RwLock::new(Ring {
                entries: VecDeque::with_capacity(capacity),
                next_index: 0,
            }),
            capacity,
            received: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            notify,
        }
    }

    /// Returns the maximum number of retained entries.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the inbound and outbound telegram counters.
    #[must_use]
    pub fn counters(&self) -> LogCounters {
        LogCounters {
            received: self.received.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
        }
    }

    /// Subscribes to entries appended from now on.
    ///
    /// A subscriber that falls behind by more than
    /// [`DEFAULT_SUBSCRIBER_CAPACITY`] entries observes a lag and should
    /// resynchronize with [`EventStore::snapshot`].
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventLogEntry> {
        self.notify.subscribe()
    }

    /// Returns retained entries with an index of at least `index`.
    ///
    /// # Arguments
    /// * `index` - First index of interest
    #[must_use]
    pub fn since(&self, index: u64) -> Vec<EventLogEntry> {
        let ring = self.ring.read();
        ring.entries
            .iter()
            .filter(|entry| entry.index >= index)
            .cloned()
            .collect()
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<EventLogEntry> {
        self.ring.read().entries.back().cloned()
    }
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryEventLog {
    fn append(&self, mut entry: EventLogEntry) -> u64 {
        let mut ring = self.ring.write();
        match entry.direction {
            Direction::Inbound => {
                self.received.fetch_add(1, Ordering::Relaxed);
            }
            Direction::Outbound => {
                self.sent.fetch_add(1, Ordering::Relaxed);
            }
            Direction::Diagnostic => {}
        }
        let index = ring.next_index;
        ring.next_index += 1;
        entry.index = index;

        if ring.entries.len() == self.capacity {
            ring.entries.pop_front();
        }
        // No subscribers is not an error.
        let _ = self.notify.send(entry.clone());
        ring.entries.push_back(entry);
        index
    }

    fn snapshot(&self) -> Vec<EventLogEntry> {
        self.ring.read().entries.iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.ring.read().entries.len()
    }

    fn clear(&self) {
        let mut ring = self.ring.write();
        ring.entries.clear();
        self.received.store(0, Ordering::Relaxed);
        self.sent.store(0, Ordering::Relaxed);
    }
}
