//! Engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayStats {
    /// Companions spawned.
    pub spawned: u64,
    /// Companions torn down (queued or immediate).
    pub destroyed: u64,
    /// Spawns rejected by the entity system.
    pub spawn_failures: u64,
    /// Per-actor task invocations.
    pub ticks: u64,
    /// Bulk restarts (`update` / `reload`).
    pub restarts: u64,
}

/// Live counters, shared by every component.
#[derive(Debug, Default)]
pub(crate) struct DisplayCounters {
    pub(crate) spawned: AtomicU64,
    pub(crate) destroyed: AtomicU64,
    pub(crate) spawn_failures: AtomicU64,
    pub(crate) ticks: AtomicU64,
    pub(crate) restarts: AtomicU64,
}

impl DisplayCounters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DisplayStats {
        DisplayStats {
            spawned: self.spawned.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            spawn_failures: self.spawn_failures.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
        }
    }
}
