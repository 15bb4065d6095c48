use crate::status::{TxState, TxStatus};
use kovan::RetiredNode;
use std::sync::Arc;

/// Immutable record "`owner` changed this variable from `old` to `new`".
///
/// A variable's slot always points at exactly one locator. Locators are never
/// edited; a variable moves on by CAS-ing in a fresh one.
///
/// # Safety Layout
///
/// `RetiredNode` **must** be the first field. Kovan casts `*mut T` to `*mut RetiredNode`
/// internally when a superseded locator is retired.
#[repr(C)]
pub(crate) struct Locator<T> {
    header: RetiredNode,
    pub(crate) old: T,
    pub(crate) new: T,
    pub(crate) owner: Arc<TxState>,
}

/// What a reader gets out of a locator.
pub(crate) enum Resolution<'l, T> {
    /// `value` is what the reader sees. `base` is what the variable held before
    /// the reader first touched it: the locator's `old` when the reader already
    /// owns it, otherwise `value` itself.
    Visible { value: &'l T, base: &'l T },
    /// The owner is another transaction that is still active.
    Conflict(&'l Arc<TxState>),
}

impl<T> Locator<T> {
    pub(crate) fn new(old: T, new: T, owner: Arc<TxState>) -> Self {
        Self {
            header: RetiredNode::new(),
            old,
            new,
            owner,
        }
    }

    /// Resolve the value this locator shows to `reader`.
    ///
    /// A reader always sees its own latest write. Otherwise the owner's status
    /// decides: committed shows `new`, aborted shows `old`, active is a conflict.
    #[inline]
    pub(crate) fn resolve(&self, reader: &Arc<TxState>) -> Resolution<'_, T> {
        if Arc::ptr_eq(&self.owner, reader) {
            return Resolution::Visible {
                value: &self.new,
                base: &self.old,
            };
        }

        let value = match self.owner.status() {
            TxStatus::Committed => &self.new,
            TxStatus::Aborted => &self.old,
            TxStatus::Active => return Resolution::Conflict(&self.owner),
        };
        Resolution::Visible { value, base: value }
    }
}
