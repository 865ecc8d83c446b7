use super::state::{COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use crate::runtime::queue::RunQueue;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::Wake;

/// Waker backing a single task.
///
/// Waking pushes the task id into the run queue at most once per
/// scheduling round; the state machine in [`state`](super::state)
/// filters duplicate and late wake-ups. Wakers are `Send + Sync`, so a
/// task may be woken from any thread even though it is only ever polled on
/// the runtime thread.
pub(crate) struct TaskWaker {
    id: usize,
    state: AtomicUsize,
    queue: Arc<RunQueue>,
}

impl TaskWaker {
    pub(crate) fn new(id: usize, queue: Arc<RunQueue>) -> Self {
        Self {
            id,
            state: AtomicUsize::new(IDLE),
            queue,
        }
    }

    /// Puts the task into the run queue unless it is already there.
    ///
    /// A task that is being polled is marked `NOTIFIED` instead and gets
    /// re-queued by [`end_poll`](Self::end_poll).
    pub(crate) fn schedule(&self) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.queue.push(self.id);
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    /// Claims the task for polling. Returns `false` for a stale queue entry.
    pub(crate) fn begin_poll(&self) -> bool {
        self.state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Ends a poll that returned `Pending`.
    pub(crate) fn end_poll(&self) {
        if self
            .state
            .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Woken during the poll.
            self.state.store(QUEUED, Ordering::Release);
            self.queue.push(self.id);
        }
    }

    pub(crate) fn complete(&self) {
        self.state.store(COMPLETED, Ordering::Release);
    }
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}
