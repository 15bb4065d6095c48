use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of an engine's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StmStats {
    /// Transaction attempts started.
    pub started: u64,
    /// Attempts that committed.
    pub commits: u64,
    /// Attempts that were discarded and retried.
    pub aborts: u64,
    /// Active owners this engine's transactions aborted while opening a variable.
    pub conflicts: u64,
}

impl StmStats {
    /// Number of retries, one per discarded attempt.
    #[inline]
    pub fn retries(&self) -> u64 {
        self.aborts
    }
}

/// Relaxed counters; they never order anything, they only count.
pub(crate) struct Counters {
    started: AtomicU64,
    commits: AtomicU64,
    aborts: AtomicU64,
    conflicts: AtomicU64,
}

impl Counters {
    pub(crate) const fn new() -> Self {
        Self {
            started: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            aborts: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn committed(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn aborted(&self) {
        self.aborts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StmStats {
        StmStats {
            started: self.started.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
        }
    }
}
