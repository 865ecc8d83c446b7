//! Timers.
//!
//! - [`sleep`] waits for a duration,
//! - [`timeout`] bounds how long a future may take.
//!
//! Both are backed by one-shot timers of the current runtime and disarm
//! their timer when dropped.

mod sleep;
mod timeout;

#[doc(inline)]
pub use sleep::{Sleep, sleep};

#[doc(inline)]
pub use timeout::{Elapsed, Timeout, timeout};
