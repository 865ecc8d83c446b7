use crate::runtime::context;
use crate::runtime::timer::TimerSlot;

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Waits until `duration` has passed since this call.
///
/// The timer is armed on the current runtime at the first poll that finds
/// the deadline still ahead. A sleep whose deadline has already passed
/// completes without touching the runtime.
///
/// # Panics
///
/// Panics if it has to arm a timer outside of a running runtime.
pub fn sleep(duration: Duration) -> Sleep {
    Sleep::new(duration)
}

/// Future returned by [`sleep`].
///
/// Dropping it disarms its timer; the task is never woken on its behalf
/// afterwards. [`Mutex::acquire`](crate::sync::Mutex::acquire) relies on
/// this to bound a wait.
pub struct Sleep {
    deadline: Instant,
    timer: Option<Rc<TimerSlot>>,
}

impl Sleep {
    pub(crate) fn new(duration: Duration) -> Self {
        Self {
            deadline: Instant::now() + duration,
            timer: None,
        }
    }

    /// The instant at which this sleep completes.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if Instant::now() >= this.deadline {
            if let Some(timer) = this.timer.take() {
                timer.cancel();
            }
            return Poll::Ready(());
        }

        match &this.timer {
            Some(timer) => timer.set_waker(cx.waker()),
            None => {
                let executor = context::current().expect("Sleep polled outside of runtime");
                this.timer = Some(executor.register_timer(this.deadline, cx.waker().clone()));
            }
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
