use super::status::{TxState, TxStatus};
use super::{Stm, StmResult, TVar};
use alloc::boxed::Box;
use kovan::Guard;
use std::sync::Arc;

type Hook = Box<dyn FnOnce() + Send>;

/// One attempt at running an atomic block.
///
/// Every read or write goes through [`TVar`]'s single open primitive, which
/// installs a locator owned by this transaction. The transaction itself only
/// carries its status word; whether its locators count is decided by flipping
/// that word once, at commit.
pub struct Transaction<'a> {
    stm: &'a Stm,
    /// Pinned for the whole attempt, so every locator we load stays valid.
    guard: &'a Guard,
    state: Arc<TxState>,
    /// Side effects to run only after a successful commit.
    post_commit_hooks: Vec<Hook>,
    /// Side effects to run only if the transaction aborts/rolls back.
    post_rollback_hooks: Vec<Hook>,
    /// Tracks if the transaction committed successfully to prevent rollback hooks in Drop.
    committed: bool,
}

impl<'a> Drop for Transaction<'a> {
    fn drop(&mut self) {
        if !self.committed {
            // Void whatever this attempt installed. No-op if already terminal.
            self.state.abort();

            let hooks = std::mem::take(&mut self.post_rollback_hooks);
            for hook in hooks {
                hook();
            }
        }
    }
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(stm: &'a Stm, guard: &'a Guard) -> Self {
        stm.record_start();
        Self {
            stm,
            guard,
            state: Arc::new(TxState::new()),
            post_commit_hooks: Vec::new(),
            post_rollback_hooks: Vec::new(),
            committed: false,
        }
    }

    #[inline]
    pub(crate) fn stm(&self) -> &'a Stm {
        self.stm
    }

    #[inline]
    pub(crate) fn guard(&self) -> &'a Guard {
        self.guard
    }

    #[inline]
    pub(crate) fn state(&self) -> &Arc<TxState> {
        &self.state
    }

    /// Current status of this attempt.
    ///
    /// Can flip from `Active` to `Aborted` at any moment when another
    /// transaction runs into one of our variables.
    #[inline]
    pub fn status(&self) -> TxStatus {
        self.state.status()
    }

    /// Read a TVar.
    ///
    /// Reading takes ownership of the variable just like a write does, so a
    /// concurrent writer will abort this transaction rather than invalidate
    /// the value silently.
    pub fn read<T>(&self, tvar: &TVar<T>) -> StmResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        tvar.open(self, T::clone)
    }

    /// Write to a TVar. Returns the written value.
    pub fn write<T>(&self, tvar: &TVar<T>, val: T) -> StmResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        tvar.open(self, move |_| val.clone())
    }

    /// Replace the value of a TVar with `f(current)`. Returns the new value.
    ///
    /// `f` may be called more than once if the access has to be retried.
    pub fn modify<T, F>(&self, tvar: &TVar<T>, f: F) -> StmResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut(&T) -> T,
    {
        tvar.open(self, f)
    }

    /// Schedule a side-effect (I/O) to run ONLY if the transaction commits successfully.
    pub fn on_commit<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_commit_hooks.push(Box::new(f));
    }

    /// Schedule a side-effect to run ONLY if the transaction aborts or fails.
    ///
    /// It runs when the attempt is dropped without committing, which covers
    /// conflicts, explicit aborts and panics inside the block.
    pub fn on_rollback<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_rollback_hooks.push(Box::new(f));
    }

    /// Active -> Committed. False if someone aborted us first.
    pub(crate) fn commit(&self) -> bool {
        self.state.commit()
    }

    /// Active -> Aborted. Harmless on a terminal transaction.
    pub(crate) fn abort(&self) -> bool {
        self.state.abort()
    }

    /// Mark a committed attempt done and run its commit hooks.
    pub(crate) fn finish(mut self) {
        self.committed = true;
        let hooks = std::mem::take(&mut self.post_commit_hooks);
        for hook in hooks {
            hook();
        }
    }
}
