//! Identity allocation for tracked objects.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Persistent identity of one tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic identity counter.
///
/// Cloning yields a handle onto the same counter, so several trackers can
/// share one identity space. Each call to [`IdAllocator::new`] starts an
/// independent sequence.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    counter: Arc<AtomicU64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next unique identity. The first identity is 1.
    pub fn next(&self) -> TrackId {
        TrackId(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Number of identities issued so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}
