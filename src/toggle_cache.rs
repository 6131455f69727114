//! A thread-safe in-memory holder for the currently active toggle snapshot. [`ToggleCache`]
//! provides concurrent access for readers (toggle evaluation) and a writer (the refresh
//! scheduler).
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::{Toggle, ToggleSnapshot};

/// `ToggleCache` provides a thread-safe (`Sync`) storage for the toggle snapshot.
///
/// The snapshot itself is immutable and can only be replaced completely. Readers never block:
/// a lookup loads the current snapshot reference and reads from it, so every lookup observes
/// either the old snapshot or the new one, never a mixture.
pub struct ToggleCache {
    snapshot: ArcSwap<ToggleSnapshot>,
}

impl ToggleCache {
    /// Create a cache seeded with `snapshot` (usually the one loaded from backup).
    pub fn new(snapshot: ToggleSnapshot) -> Self {
        ToggleCache {
            snapshot: ArcSwap::from_pointee(snapshot),
        }
    }

    /// Look up a toggle in the current snapshot.
    pub fn get(&self, name: &str) -> Option<Arc<Toggle>> {
        self.snapshot.load().get(name).cloned()
    }

    /// Get the currently published snapshot.
    ///
    /// The returned snapshot is not affected by further replacements, so callers that need a
    /// consistent view across several lookups should hold on to it.
    pub fn snapshot(&self) -> Arc<ToggleSnapshot> {
        self.snapshot.load_full()
    }

    /// Atomically publish `snapshot` as the system of record.
    pub fn replace(&self, snapshot: Arc<ToggleSnapshot>) {
        self.snapshot.store(snapshot);
    }
}

impl Default for ToggleCache {
    fn default() -> Self {
        ToggleCache::new(ToggleSnapshot::empty())
    }
}
