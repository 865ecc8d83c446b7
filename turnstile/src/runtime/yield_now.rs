use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`yield_now`].
#[must_use = "futures do nothing unless polled"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }

        // Re-queue behind everything that is already runnable.
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Lets every task that is already runnable take a turn, then resumes.
///
/// Lock tests lean on this to force an interleaving: a task that yields
/// while holding a guard gives queued waiters a chance to observe that they
/// are still blocked.
///
/// ```rust,ignore
/// let guard = mutex.acquire(None).await?;
/// yield_now().await;
/// guard.release();
/// ```
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}
