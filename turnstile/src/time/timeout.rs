use crate::time::sleep::{Sleep, sleep};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use thiserror::Error;

/// Error returned by [`Timeout`] when the deadline passes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline has elapsed")]
pub struct Elapsed(());

/// Requires `future` to complete within `duration`.
///
/// The inner future is dropped together with the returned [`Timeout`]. For
/// the locks of this crate, dropping a pending acquisition removes it from
/// the lock's queue, which makes this the way to bound a wait on
/// [`RwLock::read`](crate::sync::RwLock::read) or
/// [`RwLock::write`](crate::sync::RwLock::write).
///
/// # Examples
///
/// ```rust,ignore
/// match timeout(Duration::from_millis(50), lock.write()).await {
///     Ok(guard) => { /* exclusive access */ }
///     Err(_) => { /* gave up, no longer queued */ }
/// }
/// ```
pub fn timeout<F>(duration: Duration, future: F) -> Timeout<F>
where
    F: Future,
{
    Timeout {
        future,
        sleep: sleep(duration),
    }
}

/// Future returned by [`timeout`].
pub struct Timeout<F> {
    future: F,
    sleep: Sleep,
}

impl<F> Future for Timeout<F>
where
    F: Future,
{
    type Output = Result<F::Output, Elapsed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Safety: `future` is never moved out of the pinned `Timeout`, and
        // `sleep` is `Unpin`.
        let this = unsafe { self.get_unchecked_mut() };

        let future = unsafe { Pin::new_unchecked(&mut this.future) };
        if let Poll::Ready(output) = future.poll(cx) {
            return Poll::Ready(Ok(output));
        }

        if Pin::new(&mut this.sleep).poll(cx).is_ready() {
            return Poll::Ready(Err(Elapsed(())));
        }

        Poll::Pending
    }
}
