use once_cell::sync::Lazy;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a transaction.
///
/// `Active` is the only state a transition can leave. `Committed` and
/// `Aborted` are terminal; whichever CAS out of `Active` lands first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TxStatus {
    /// Still running; its locators are provisional.
    Active = 0,
    /// Its locators' new values are permanent.
    Committed = 1,
    /// Its locators' new values are void.
    Aborted = 2,
}

impl TxStatus {
    #[inline]
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TxStatus::Active,
            1 => TxStatus::Committed,
            2 => TxStatus::Aborted,
            _ => unreachable!("invalid transaction status word: {raw}"),
        }
    }
}

/// Shared status word of one transaction.
///
/// Locators point at this, not at the `Transaction` itself, so the status
/// outlives the attempt for as long as any locator still names it as owner.
/// Identity is the allocation: compare with [`Arc::ptr_eq`].
#[derive(Debug)]
pub(crate) struct TxState {
    status: AtomicU8,
}

impl TxState {
    pub(crate) fn new() -> Self {
        Self {
            status: AtomicU8::new(TxStatus::Active as u8),
        }
    }

    #[inline]
    pub(crate) fn status(&self) -> TxStatus {
        TxStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Active -> Committed. Returns whether this call made the transition.
    #[inline]
    pub(crate) fn commit(&self) -> bool {
        self.transition(TxStatus::Committed)
    }

    /// Active -> Aborted. Returns whether this call made the transition.
    ///
    /// Calling it on a terminal transaction does nothing.
    #[inline]
    pub(crate) fn abort(&self) -> bool {
        self.transition(TxStatus::Aborted)
    }

    #[inline]
    fn transition(&self, to: TxStatus) -> bool {
        self.status
            .compare_exchange(
                TxStatus::Active as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

/// Pre-committed owner of every variable's first locator.
///
/// Built once on first use and never torn down. Because it is committed, a
/// fresh variable's initial value resolves like any other committed write.
static ROOT: Lazy<Arc<TxState>> = Lazy::new(|| {
    let root = TxState::new();
    let committed = root.commit();
    debug_assert!(committed);
    Arc::new(root)
});

#[inline]
pub(crate) fn root() -> Arc<TxState> {
    Arc::clone(&ROOT)
}
