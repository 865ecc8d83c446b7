//! Synchronization primitives for tasks sharing one thread.
//!
//! - [`Mutex`] - exclusive access, FIFO queue, optional timeout per
//!   acquisition.
//! - [`RwLock`] - shared reads or one exclusive write, FIFO queue with
//!   writer preference.
//!
//! ## Design notes
//!
//! - The locks guard a resource they know nothing about; callers keep their
//!   state elsewhere and acquire before touching it.
//! - A task that cannot be admitted is queued and suspended. Releasing a
//!   guard grants the lock to the next eligible waiter on the spot, then
//!   wakes it, so ownership never floats free between two tasks.
//! - Guards are the release handles. Releasing consumes them; dropping them
//!   (including during unwinding) releases too.
//! - Dropping a pending acquisition future withdraws the request.
//! - The locks are `!Sync`: all state changes happen on the runtime thread,
//!   inside a single poll.

mod error;
mod mutex;
mod rwlock;
mod waiters;

pub use error::{MisuseError, TimeoutError};
pub use mutex::{Acquire, Mutex, MutexGuard};
pub use rwlock::{ReadGuard, ReadLock, RwLock, WriteGuard, WriteLock};
