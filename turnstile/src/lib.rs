//! # Turnstile
//!
//! **Turnstile** provides fair, cooperative locks for asynchronous tasks
//! that interleave on a single thread, together with the small runtime they
//! run on.
//!
//! - [`Mutex`] - exclusive access, granted in arrival order, with an
//!   optional timeout per acquisition and scoped
//!   [`run_exclusive`](Mutex::run_exclusive).
//! - [`RwLock`] - many readers or one writer, granted in arrival order with
//!   writer preference so that a steady stream of readers cannot starve a
//!   waiting writer.
//!
//! The runtime is single-threaded: tasks do not need to be `Send`, and every
//! lock state transition happens synchronously inside one poll.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use turnstile::sync::Mutex;
//! use turnstile::task;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! #[turnstile::main]
//! async fn main() {
//!     let mutex = Rc::new(Mutex::new());
//!
//!     let worker = task::spawn({
//!         let mutex = mutex.clone();
//!         async move {
//!             mutex
//!                 .run_exclusive(Some(Duration::from_millis(100)), || async {
//!                     // critical section
//!                     Ok::<_, turnstile::sync::TimeoutError>(())
//!                 })
//!                 .await
//!         }
//!     });
//!
//!     worker.await.expect("lock acquired in time");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`sync`] - the locks
//! - [`time`] - sleep and timeout
//! - [`task`] - spawning and join handles

mod runtime;
mod utils;

pub mod sync;
pub mod time;

pub use runtime::Runtime;
pub use runtime::builder::RuntimeBuilder;
pub use runtime::task;
pub use runtime::yield_now::{YieldNow, yield_now};
pub use sync::{Mutex, RwLock};

pub use turnstile_macros::*;
