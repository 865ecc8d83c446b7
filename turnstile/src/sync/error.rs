use std::time::Duration;

use thiserror::Error;

/// A [`Mutex`](super::Mutex) acquisition did not complete in time.
///
/// The waiter has already left the queue when this is returned; retrying
/// queues it again at the back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mutex acquire timed out after {}ms", .duration.as_millis())]
pub struct TimeoutError {
    duration: Duration,
}

impl TimeoutError {
    pub(crate) fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// The bound that was requested.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// A release that has no matching acquisition.
///
/// This is a bug in the caller or in the lock bookkeeping. Guards turn it
/// into a panic instead of adjusting the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MisuseError {
    #[error("unlock without matching lock")]
    Unlock,

    #[error("read unlock without matching lock")]
    ReadUnlock,

    #[error("write unlock without matching lock")]
    WriteUnlock,
}
