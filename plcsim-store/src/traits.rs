/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Event store trait definition.
//!
//! This module defines the interface the core writes its event log through.

use crate::entry::EventLogEntry;
use plcsim_core::telegram::Telegram;

/// Append-only record of telegrams and diagnostics.
///
/// Implementations must be safe to append to from several tasks at once;
/// entries keep arrival order.
pub trait EventStore: Send + Sync {
    /// Appends an entry and returns the index assigned to it.
    ///
    /// # Arguments
    /// * `entry` - The entry to record; its `index` is overwritten
    fn append(&self, entry: EventLogEntry) -> u64;

    /// Returns a copy of the retained entries, oldest first.
    fn snapshot(&self) -> Vec<EventLogEntry>;

    /// Returns the number of retained entries.
    fn len(&self) -> usize;

    /// Returns true if no entries are retained.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all entries.
    fn clear(&self);

    /// Records a received telegram.
    fn record_inbound(&self, telegram: Telegram) -> u64 {
        self.append(EventLogEntry::inbound(telegram))
    }

    /// Records a telegram written to the socket.
    fn record_outbound(&self, telegram: Telegram) -> u64 {
        self.append(EventLogEntry::outbound(telegram))
    }

    /// Records a diagnostic message.
    fn record_diagnostic(&self, detail: &str) -> u64 {
        self.append(EventLogEntry::diagnostic(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use plcsim_core::telegram::LifeSignal;
    use plcsim_core::types::Direction;

    #[derive(Default)]
    struct VecStore {
        entries: Mutex<Vec<EventLogEntry>>,
    }

    impl EventStore for VecStore {
        fn append(&self, mut entry: EventLogEntry) -> u64 {
            let mut entries = self.entries.lock();
            entry.index = entries.len() as u64;
            entries.push(entry);
            entries.len() as u64 - 1
        }

        fn snapshot(&self) -> Vec<EventLogEntry> {
            self.entries.lock().clone()
        }

        fn len(&self) -> usize {
            self.entries.lock().len()
        }

        fn clear(&self) {
            self.entries.lock().clear();
        }
    }

    #[test]
    fn test_default_record_helpers() {
        let store = VecStore::default();
        assert!(store.is_empty());

        let ping = Telegram::life("A", "B", 1, LifeSignal::Ping);
        assert_eq!(store.record_inbound(ping.clone()), 0);
        assert_eq!(store.record_outbound(ping), 1);
        assert_eq!(store.record_diagnostic("hello"), 2);

        let directions: Vec<_> = store.snapshot().iter().map(|e| e.direction).collect();
        assert_eq!(
            directions,
            vec![Direction::Inbound, Direction::Outbound, Direction::Diagnostic]
        );

        store.clear();
        assert_eq!(store.len(), 0);
    }
}
