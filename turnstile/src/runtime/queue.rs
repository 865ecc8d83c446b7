use parking_lot::{Condvar, Mutex};

use std::collections::VecDeque;
use std::time::Instant;

/// Ready queue of task ids.
///
/// Wakers may fire from any thread, so the queue sits behind a lock and
/// the runtime thread parks on a condition variable when it runs dry.
pub(crate) struct RunQueue {
    ready: Mutex<VecDeque<usize>>,
    condvar: Condvar,
}

impl RunQueue {
    pub(crate) fn new() -> Self {
        Self {
            ready: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        }
    }

    /// Appends a task id and unparks the runtime thread.
    pub(crate) fn push(&self, id: usize) {
        self.ready.lock().push_back(id);
        self.condvar.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<usize> {
        self.ready.lock().pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ready.lock().is_empty()
    }

    /// Parks the calling thread until a task id is pushed.
    pub(crate) fn park(&self) {
        let mut ready = self.ready.lock();

        while ready.is_empty() {
            self.condvar.wait(&mut ready);
        }
    }

    /// Parks the calling thread until a task id is pushed or `deadline` passes.
    pub(crate) fn park_until(&self, deadline: Instant) {
        let mut ready = self.ready.lock();

        if ready.is_empty() {
            let _ = self.condvar.wait_until(&mut ready, deadline);
        }
    }
}
