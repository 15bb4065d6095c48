#![doc(
    html_logo_url = "https://raw.githubusercontent.com/vertexclique/kovan/master/art/kovan-square.svg"
)]
//! Obstruction-free STM using Kovan for memory reclamation.
//!
//! # Architecture
//!
//! Every variable holds a pointer to an immutable *locator*: the value before
//! some transaction touched it, the value after, and that transaction's status
//! word. There is no separate committed store and no lock anywhere.
//!
//! - **Access**: Reads and writes are the same operation. A transaction CASes a
//!   fresh locator owned by itself into the variable.
//! - **Conflicts**: Resolved eagerly. Finding another *active* owner on a
//!   variable aborts that owner on the spot, then the access retries.
//! - **Commit**: A single CAS of the status word from `Active` to `Committed`
//!   makes every locator the transaction installed visible at once.
//! - **Reclamation**: Superseded locators are passed to Kovan's `retire` mechanism.
//!
//! Some transaction always makes progress, though a particular one may be
//! aborted and retried without bound under heavy contention.

extern crate alloc;

mod errors;
mod locator;
mod stats;
mod status;
mod transaction;
mod var;

pub use errors::{StmError, StmResult, abort};
pub use stats::StmStats;
pub use status::TxStatus;
pub use transaction::Transaction;
pub use var::TVar;

use kovan::pin;
use stats::Counters;
use tracing::{debug, trace};

/// The STM engine. Holds nothing but counters; variables are not tied to it.
pub struct Stm {
    counters: Counters,
}

impl Stm {
    /// Create a new STM engine instance.
    pub const fn new() -> Self {
        Self {
            counters: Counters::new(),
        }
    }
}

impl Default for Stm {
    fn default() -> Self {
        Self::new()
    }
}

impl Stm {
    /// Execute a closure atomically.
    ///
    /// This function handles transaction retries automatically and only returns
    /// once an attempt has committed.
    ///
    /// DANGER AHEAD: Don't use IO bound operations inside the closure.
    /// It might be retried many times, or cut short at any variable access.
    /// Use [`Transaction::on_commit`] for effects that must happen once.
    ///
    /// # Example
    ///
    /// ```
    /// use kovan_dstm::Stm;
    /// let stm = Stm::new();
    /// let var = stm.tvar(10);
    ///
    /// stm.atomically(|tx| {
    ///     let val = tx.read(&var)?;
    ///     tx.write(&var, val + 1)?;
    ///     Ok(())
    /// });
    ///
    /// assert_eq!(stm.atomically(|tx| tx.read(&var)), 11);
    /// ```
    pub fn atomically<F, T>(&self, mut f: F) -> T
    where
        F: FnMut(&mut Transaction) -> StmResult<T>,
    {
        loop {
            // 1. Enter Kovan critical section.
            // Every locator loaded during this attempt stays valid until the guard drops.
            let guard = pin();

            // 2. Fresh transaction, Active.
            let mut tx = Transaction::new(self, &guard);

            // 3. Run user logic
            match f(&mut tx) {
                Ok(result) => {
                    // 4. Attempt to commit
                    if tx.commit() {
                        let late_abort = tx.abort();
                        debug_assert!(!late_abort, "abort after commit must be a no-op");
                        self.counters.committed();
                        tx.finish();
                        return result;
                    }
                    // Lost the race: someone aborted us before our commit CAS.
                    debug!("commit lost to a conflicting transaction, retrying");
                }
                Err(StmError::Aborted) => {
                    trace!("transaction attempt aborted, retrying");
                }
            }

            // Discard the attempt. Dropping aborts it and runs the rollback hooks.
            drop(tx);
            self.counters.aborted();
            std::thread::yield_now();
        }
    }

    /// Create a new transactional variable.
    pub fn tvar<T: Clone + Send + Sync + 'static>(&self, data: T) -> TVar<T> {
        TVar::new(data)
    }

    /// Snapshot of this engine's counters.
    pub fn stats(&self) -> StmStats {
        self.counters.snapshot()
    }

    #[inline]
    pub(crate) fn record_start(&self) {
        self.counters.started();
    }

    #[inline]
    pub(crate) fn record_conflict(&self) {
        self.counters.conflict();
    }
}

/// Global singleton for easier usage if preferred, though explicitly passing Stm is cleaner.
pub static STM: Stm = Stm::new();

/// Convenience helper using the global STM instance.
pub fn atomically<F, T>(f: F) -> T
where
    F: FnMut(&mut Transaction) -> StmResult<T>,
{
    STM.atomically(f)
}
