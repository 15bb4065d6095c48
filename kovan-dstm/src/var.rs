use crate::errors::{StmError, StmResult};
use crate::locator::{Locator, Resolution};
use crate::status::{self, TxStatus};
use crate::transaction::Transaction;
use alloc::boxed::Box;
use kovan::{Atomic, Shared, retire};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::trace;

/// A Transactional Variable.
///
/// Handles are cheap to clone; every clone refers to the same variable.
/// The variable's whole visible history lives in its current locator, there is
/// no separate committed store.
pub struct TVar<T>(pub(crate) Arc<TVarInner<T>>);

pub(crate) struct TVarInner<T> {
    /// The current locator. Never null while the variable is alive.
    /// Accessing this requires a `Guard`.
    slot: Atomic<Locator<T>>,
}

impl<T: Clone + Send + Sync + 'static> TVar<T> {
    /// Create a new TVar.
    ///
    /// The first locator is owned by the pre-committed root transaction, so the
    /// value is readable by any transaction right away.
    pub fn new(val: T) -> Self {
        let first = Box::new(Locator::new(val.clone(), val, status::root()));
        Self(Arc::new(TVarInner {
            slot: Atomic::new(Box::into_raw(first)),
        }))
    }

    /// Open the variable inside `tx`, installing `update(current)` as its new value.
    ///
    /// Read is `open` with identity, write is `open` with a constant. Any active
    /// foreign owner found on the slot gets aborted and the access retries.
    /// Returns the installed value, or `StmError::Aborted` if `tx` itself was
    /// aborted by someone else in the meantime.
    pub(crate) fn open<F>(&self, tx: &Transaction<'_>, mut update: F) -> StmResult<T>
    where
        F: FnMut(&T) -> T,
    {
        let guard = tx.guard();
        let me = tx.state();

        loop {
            // 1. Snapshot the slot.
            let current = self.0.slot.load(Ordering::Acquire, guard);

            // SAFETY: The slot is never null and the guard keeps the locator
            // alive until we unpin, even if it gets retired concurrently.
            let locator = unsafe { current.as_ref() }.expect("tvar slot is never null");

            // 2. Resolve what `tx` is allowed to see.
            let (seen, base) = match locator.resolve(me) {
                Resolution::Visible { value, base } => (value, base),
                Resolution::Conflict(owner) => {
                    // Eager contention management: abort the interferer and look again.
                    if owner.abort() {
                        tx.stm().record_conflict();
                        trace!("aborted conflicting owner during open");
                    }
                    core::hint::spin_loop();
                    continue;
                }
            };

            // 3. Build the replacement locator. `old` stays the value from before
            // `tx` first opened the variable, however many times it opens it again.
            let updated = update(seen);
            let result = updated.clone();
            let fresh = Box::into_raw(Box::new(Locator::new(
                base.clone(),
                updated,
                Arc::clone(me),
            )));

            // 4. Publish it.
            // SAFETY: `fresh` comes straight from `Box::into_raw`.
            let fresh_shared = unsafe { Shared::from_raw(fresh) };
            match self.0.slot.compare_exchange(
                current,
                fresh_shared,
                Ordering::AcqRel,
                Ordering::Acquire,
                guard,
            ) {
                Ok(_) => {
                    // SAFETY: `current` is unreachable from the slot now and is
                    // retired exactly once, by the thread that unlinked it.
                    // Locator is #[repr(C)] with RetiredNode at offset 0.
                    unsafe { retire(current.as_raw()) };
                }
                Err(_) => {
                    // SAFETY: `fresh` was never published, we still own it.
                    drop(unsafe { Box::from_raw(fresh) });
                    continue;
                }
            }

            // 5. Someone may have aborted us while we were installing.
            if me.status() == TxStatus::Aborted {
                return Err(StmError::Aborted);
            }
            return Ok(result);
        }
    }
}

impl<T> Clone for TVar<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> TVar<T> {
    /// Whether two handles refer to the same variable.
    #[inline]
    pub fn ptr_eq(&self, other: &TVar<T>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Drop for TVarInner<T> {
    fn drop(&mut self) {
        let guard = kovan::pin();
        let current = self.slot.load(Ordering::Acquire, &guard);
        debug_assert!(!current.is_null(), "tvar slot is never null");
        // SAFETY: Last handle is gone, so no transaction can reach this slot.
        // The current locator was never retired; free it directly.
        unsafe { drop(Box::from_raw(current.as_raw())) };
    }
}
