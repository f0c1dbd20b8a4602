//! Latest-value slots shared between input producers and the control loop
//!
//! Producers replace the whole value in one assignment under the lock, so the
//! loop never observes a partially updated multi-field input.

use std::sync::RwLock;

/// A value tagged with the sequence number of its publication
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamped<T> {
    /// Starts at 1 for the first published value
    pub seq: u64,
    pub value: T,
}

/// Holds the most recently published value of `T`
#[derive(Debug)]
pub struct Latest<T> {
    slot: RwLock<Option<Stamped<T>>>,
}

impl<T: Copy> Latest<T> {
    pub fn new() -> Self {
        Latest { slot: RwLock::new(None) }
    }

    /// Replace the current value, returning its sequence number
    pub fn publish(&self, value: T) -> u64 {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        let seq = slot.as_ref().map_or(1, |s| s.seq + 1);
        *slot = Some(Stamped { seq, value });
        seq
    }

    /// Consistent copy of the current value, if anything was published yet
    pub fn snapshot(&self) -> Option<Stamped<T>> {
        *self.slot.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn value(&self) -> Option<T> {
        self.snapshot().map(|s| s.value)
    }
}

impl<T: Copy> Default for Latest<T> {
    fn default() -> Self {
        Self::new()
    }
}
