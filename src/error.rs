//! Errors reported by the strict forms of the queue operations.

/// Error returned by [`Queue::element`], [`Queue::remove`] and the `add` methods.
///
/// The non-failing counterparts ([`Queue::peek`], [`Queue::poll`], `offer`) report
/// the same conditions through their return value instead.
///
/// [`Queue::element`]: crate::Queue::element
/// [`Queue::remove`]: crate::Queue::remove
/// [`Queue::peek`]: crate::Queue::peek
/// [`Queue::poll`]: crate::Queue::poll
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, thiserror::Error)]
pub enum Error {
    /// The queue held no element when the operation was attempted.
    #[error("queue is empty")]
    Empty,

    /// `offer` refused the element.
    ///
    /// The queue is unbounded so this is never returned today; it is kept so that
    /// `add` has the same contract as a bounded queue would.
    #[error("failed to append element to the queue")]
    AppendFailure,
}
