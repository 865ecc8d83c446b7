use super::context::enter_context;
use super::executor::Executor;
use super::task::JoinHandle;

use std::future::Future;
use std::rc::Rc;

/// The main runtime handle.
///
/// `Runtime` is responsible for:
/// - spawning asynchronous tasks,
/// - driving every task on the calling thread,
/// - firing timers,
/// - providing a synchronous entry point via [`block_on`](Self::block_on).
///
/// All tasks interleave on one thread, so futures do not need to be `Send`
/// and state transitions inside a poll never race with another task.
///
/// Dropping the runtime drops every unfinished task.
pub struct Runtime {
    executor: Rc<Executor>,
}

impl Runtime {
    pub(crate) fn new(event_interval: usize, stall_detection: bool) -> Self {
        log::debug!(
            "starting runtime (event_interval={event_interval}, stall_detection={stall_detection})"
        );

        Self {
            executor: Rc::new(Executor::new(event_interval, stall_detection)),
        }
    }

    /// Spawns a future onto the runtime.
    ///
    /// The task makes progress while [`block_on`](Self::block_on) runs.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let handle = runtime.spawn(async { 7 });
    /// assert_eq!(runtime.block_on(handle), 7);
    /// ```
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.executor.spawn(future)
    }

    /// Runs a future to completion on the current thread.
    ///
    /// Spawned tasks run alongside it. Tasks still unfinished when `future`
    /// completes stay in the runtime and resume on the next call.
    ///
    /// # Panics
    ///
    /// Panics if a task panics, or on a stall when stall detection is on.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = runtime.block_on(async { 42 });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        enter_context(self.executor.clone(), || self.executor.block_on(future))
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.executor.shutdown();
        log::debug!("runtime shut down");
    }
}
