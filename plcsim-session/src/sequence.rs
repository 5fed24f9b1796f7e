/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Outbound sequence numbers.
//!
//! This module provides lock-free allocation of the six-digit sequence
//! numbers stamped on every telegram the simulator originates.

use std::sync::atomic::{AtomicU32, Ordering};

/// Sequence numbers wrap to zero at this value.
pub const SEQUENCE_WRAP: u32 = 1_000_000;

/// Allocates outbound sequence numbers.
///
/// The first allocation returns 1; after 999 999 the counter wraps to 0.
#[derive(Debug, Default)]
pub struct SequenceManager {
    last: AtomicU32,
}

impl SequenceManager {
    /// Creates a manager whose first allocation is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager whose first allocation follows `last`.
    ///
    /// # Arguments
    /// * `last` - Value treated as already allocated
    #[must_use]
    pub fn with_last(last: u32) -> Self {
        Self {
            last: AtomicU32::new(last % SEQUENCE_WRAP),
        }
    }

    /// Allocates the next sequence number.
    #[inline]
    pub fn allocate(&self) -> u32 {
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(next(last))
            })
            .unwrap_or_else(|last| last);
        next(previous)
    }

    /// Returns the most recently allocated number, 0 before any allocation.
    #[inline]
    #[must_use]
    pub fn last(&self) -> u32 {
        self.last.load(Ordering::SeqCst)
    }

    /// Restarts numbering so the next allocation returns 1.
    pub fn reset(&self) {
        self.last.store(0, Ordering::SeqCst);
    }
}

#[inline]
const fn next(last: u32) -> u32 {
    (last + 1) % SEQUENCE_WRAP
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_first_allocation_is_one() {
        let seq = SequenceManager::new();
        assert_eq!(seq.last(), 0);
        assert_eq!(seq.allocate(), 1);
        assert_eq!(seq.allocate(), 2);
        assert_eq!(seq.last(), 2);
    }

    #[test]
    fn test_wraps_after_max() {
        let seq = SequenceManager::with_last(999_998);
        assert_eq!(seq.allocate(), 999_999);
        assert_eq!(seq.allocate(), 0);
        assert_eq!(seq.allocate(), 1);
    }

    #[test]
    fn test_reset() {
        let seq = SequenceManager::new();
        seq.allocate();
        seq.allocate();
        seq.reset();
        assert_eq!(seq.allocate(), 1);
    }

    #[test]
    fn test_concurrent_allocations_are_unique() {
        let seq = Arc::new(SequenceManager::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seq = Arc::clone(&seq);
                std::thread::spawn(move || (0..250).map(|_| seq.allocate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for n in handle.join().unwrap() {
                assert!(seen.insert(n));
            }
        }
        assert_eq!(seen.len(), 1000);
        assert_eq!(seq.last(), 1000);
    }
}
