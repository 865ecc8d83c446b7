//! Task spawning and join handles.
//!
//! Tasks are plain futures owned by the runtime's task table and polled on
//! the runtime thread. They do not need to be `Send`: every lock in this
//! crate is built for tasks that interleave on one thread.

pub(crate) mod handle;
pub(crate) mod state;
pub(crate) mod waker;

pub use handle::JoinHandle;

use crate::runtime::context;

use std::future::Future;

/// Spawns a future as a task onto the current runtime.
///
/// The task starts running the next time the runtime gets control, i.e.
/// when the spawning task yields.
///
/// # Panics
///
/// Panics if called outside the context of a running runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let handle = task::spawn(async { 40 + 2 });
/// assert_eq!(handle.await, 42);
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    context::current()
        .expect("spawn must be called within the context of a runtime")
        .spawn(future)
}
