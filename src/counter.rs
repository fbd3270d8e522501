//! Shared counter cell updated by every execution unit of a run.

use std::sync::atomic::{AtomicI64, Ordering};

/// A single integer memory location with an atomic increment.
///
/// Owned by the orchestrating context; execution units only ever borrow it.
#[derive(Debug, Default)]
pub struct SharedCounter {
    value: AtomicI64,
}

impl SharedCounter {
    pub fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
        }
    }

    /// Atomically add one. Returns the value after the increment.
    pub fn increment(&self) -> i64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Consume the cell and return its final value
    pub fn into_inner(self) -> i64 {
        self.value.into_inner()
    }
}
