//! Scheduling states of a task.
//!
//! The executor owns the transitions out of `QUEUED` and `RUNNING`; wakers
//! own the transitions out of `IDLE`.

/// Not queued; waiting for a wake-up.
pub(crate) const IDLE: usize = 0;

/// Sitting in the run queue.
pub(crate) const QUEUED: usize = 1;

/// Being polled right now.
pub(crate) const RUNNING: usize = 2;

/// Finished. Further wake-ups are ignored.
pub(crate) const COMPLETED: usize = 3;

/// Woken while being polled; goes back into the run queue once the poll ends.
pub(crate) const NOTIFIED: usize = 4;
