use super::error::{MisuseError, TimeoutError};
use super::waiters::WaitQueue;
use crate::time::{Sleep, sleep};

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// A fair asynchronous mutex.
///
/// `Mutex` serializes tasks that interleave on one thread. It does not wrap
/// the data it protects: callers keep their shared state wherever they like
/// and route every access through [`run_exclusive`](Self::run_exclusive) or
/// an [`acquire`](Self::acquire) / [`MutexGuard::release`] pair.
///
/// - Waiters are granted strictly in arrival order.
/// - Releasing hands the lock straight to the oldest waiter; nobody can
///   barge in between.
/// - An acquisition may carry a timeout. A waiter that times out leaves the
///   queue and is never granted afterwards.
///
/// # Example
///
/// ```rust,ignore
/// let mutex = Mutex::new();
///
/// let guard = mutex.acquire(Some(Duration::from_millis(50))).await?;
/// // ... critical section ...
/// guard.release();
/// ```
pub struct Mutex {
    state: RefCell<State>,
}

struct State {
    /// Whether some guard is outstanding.
    locked: bool,

    waiters: WaitQueue<()>,
}

impl Mutex {
    /// Creates an unlocked mutex with an empty queue.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                locked: false,
                waiters: WaitQueue::new(),
            }),
        }
    }

    /// Acquires the mutex, waiting at most `timeout` if it is held.
    ///
    /// A free mutex is granted on the first poll without suspending and
    /// without arming a timer. Otherwise the caller joins the back of the
    /// queue. If the timer fires before the grant, the caller leaves the
    /// queue and gets a [`TimeoutError`]; a grant that happened first always
    /// wins.
    ///
    /// The `timeout` window starts when the caller joins the queue, i.e. at
    /// the first poll that finds the mutex held, not when `acquire` is
    /// called. A future built early and awaited later gets the full window.
    ///
    /// Dropping the returned future before it completes removes the caller
    /// from the queue.
    pub fn acquire(&self, timeout: Option<Duration>) -> Acquire<'_> {
        Acquire {
            mutex: self,
            timeout,
            key: None,
            timer: None,
        }
    }

    /// Acquires the mutex only if it is free right now. Never queues.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_>> {
        let mut state = self.state.borrow_mut();

        if state.locked {
            return None;
        }

        state.locked = true;
        Some(MutexGuard { mutex: self })
    }

    /// Runs `operation` while holding the mutex.
    ///
    /// The mutex is released before the outcome is returned, whether
    /// `operation` succeeds, fails, or panics. If acquisition itself times
    /// out, `operation` is not run and the [`TimeoutError`] is converted
    /// into `E`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let total = mutex
    ///     .run_exclusive(None, || async {
    ///         let value = store.load().await?;
    ///         store.save(value + 1).await
    ///     })
    ///     .await?;
    /// ```
    pub async fn run_exclusive<F, Fut, T, E>(
        &self,
        timeout: Option<Duration>,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TimeoutError>,
    {
        let guard = self.acquire(timeout).await?;
        let outcome = operation().await;
        guard.release();

        outcome
    }

    /// Whether a guard is currently outstanding.
    pub fn is_locked(&self) -> bool {
        self.state.borrow().locked
    }

    /// Number of tasks waiting in the queue.
    pub fn waiters(&self) -> usize {
        self.state.borrow().waiters.len()
    }

    /// Hands the lock to the oldest waiter, or marks it free.
    fn unlock(&self) -> Result<(), MisuseError> {
        let next = {
            let mut state = self.state.borrow_mut();

            if !state.locked {
                return Err(MisuseError::Unlock);
            }

            let next = state.waiters.grant_front();
            if next.is_none() {
                state.locked = false;
            }
            next
        };

        match next {
            Some(waker) => {
                log::trace!("mutex handed over to the next waiter");
                waker.wake();
            }
            None => log::trace!("mutex released"),
        }

        Ok(())
    }

    fn release(&self) {
        if let Err(err) = self.unlock() {
            panic!("{err}");
        }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Mutex");

        match self.state.try_borrow() {
            Ok(state) => d
                .field("locked", &state.locked)
                .field("waiters", &state.waiters.len()),
            Err(_) => d.field("state", &format_args!("<borrowed>")),
        };

        d.finish()
    }
}

/// Future returned by [`Mutex::acquire`].
#[must_use = "futures do nothing unless polled"]
pub struct Acquire<'a> {
    mutex: &'a Mutex,
    timeout: Option<Duration>,

    /// Queue key, while queued or granted but not yet observed.
    key: Option<usize>,

    /// Armed only once the caller is queued.
    timer: Option<Sleep>,
}

impl<'a> Future for Acquire<'a> {
    type Output = Result<MutexGuard<'a>, TimeoutError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mutex = this.mutex;

        {
            let mut state = mutex.state.borrow_mut();

            match this.key {
                None => {
                    if !state.locked {
                        state.locked = true;
                        log::trace!("mutex acquired without waiting");
                        return Poll::Ready(Ok(MutexGuard { mutex }));
                    }

                    let key = state.waiters.push((), cx.waker().clone());
                    log::trace!("mutex busy, queued waiter {key}");

                    this.key = Some(key);
                    this.timer = this.timeout.map(sleep);
                }
                Some(key) => {
                    if state.waiters.is_granted(key) {
                        state.waiters.remove(key);
                        this.key = None;
                        this.timer = None;
                        return Poll::Ready(Ok(MutexGuard { mutex }));
                    }

                    state.waiters.refresh(key, cx.waker());
                }
            }
        }

        if let (Some(timer), Some(duration)) = (this.timer.as_mut(), this.timeout) {
            if Pin::new(timer).poll(cx).is_ready() {
                if let Some(key) = this.key.take() {
                    mutex.state.borrow_mut().waiters.remove(key);
                }
                this.timer = None;

                log::debug!("mutex acquire timed out after {duration:?}");
                return Poll::Ready(Err(TimeoutError::new(duration)));
            }
        }

        Poll::Pending
    }
}

impl Drop for Acquire<'_> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        let granted = self.mutex.state.borrow_mut().waiters.remove(key);

        if granted == Some(true) {
            log::debug!("cancelled waiter {key} already owned the mutex, passing it on");
            self.mutex.release();
        } else {
            log::debug!("mutex waiter {key} cancelled");
        }
    }
}

/// Release handle for a [`Mutex`].
///
/// Exactly one guard exists while the mutex is locked. Releasing consumes
/// the guard, so it cannot be released twice; dropping it releases as well.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a> {
    mutex: &'a Mutex,
}

impl MutexGuard<'_> {
    /// Releases the mutex, granting it to the oldest waiter if there is one.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.release();
    }
}

impl fmt::Debug for MutexGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexGuard").finish_non_exhaustive()
    }
}
