use thiserror::Error;

/// Signal that unwinds a transaction attempt back to the driver.
///
/// There is exactly one kind: the attempt lost a conflict (or was aborted
/// explicitly) and its work must be discarded. `atomically` never surfaces it
/// to its caller; it restarts the block with a fresh transaction instead.
///
/// Always propagate it with `?`. Swallowing it lets a body keep running on an
/// attempt whose writes are already void.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StmError {
    /// The transaction was aborted and should be retried.
    #[error("transaction aborted")]
    Aborted,
}

/// Result of a transactional operation.
pub type StmResult<T> = Result<T, StmError>;

/// Abort the current attempt explicitly.
///
/// The driver discards everything the attempt did and runs the block again.
///
/// # Example
///
/// ```
/// use kovan_dstm::{abort, Stm};
///
/// let stm = Stm::new();
/// let ticket = stm.tvar(0u32);
///
/// let mut attempts = 0;
/// let seen = stm.atomically(|tx| {
///     attempts += 1;
///     let t = tx.read(&ticket)?;
///     if attempts < 3 {
///         tx.write(&ticket, t + 100)?;
///         return abort();
///     }
///     Ok(t)
/// });
///
/// // Writes of the aborted attempts never became visible.
/// assert_eq!(seen, 0);
/// ```
#[inline]
pub fn abort<T>() -> StmResult<T> {
    Err(StmError::Aborted)
}
