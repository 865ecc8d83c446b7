//! Single-threaded cooperative runtime.
//!
//! This is the scheduling substrate the locks rely on:
//! - suspending a task until a waker fires,
//! - one-shot timers that can be cancelled before they fire.
//!
//! Every task runs on the thread that calls [`Runtime::block_on`].

mod core;
mod executor;
mod queue;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod timer;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::Runtime;
