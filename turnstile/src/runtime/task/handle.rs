use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Completion slot shared between a task and its [`JoinHandle`].
struct JoinState<T> {
    output: Option<T>,
    finished: bool,
    waiter: Option<Waker>,
}

/// A handle to a spawned task.
///
/// `JoinHandle` implements [`Future`] and resolves to the task's output once
/// the task has completed.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
pub struct JoinHandle<T> {
    state: Rc<RefCell<JoinState<T>>>,
}

impl<T> JoinHandle<T> {
    /// Returns `true` once the task has run to completion.
    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut state = self.state.borrow_mut();

        if let Some(output) = state.output.take() {
            return Poll::Ready(output);
        }

        state.waiter = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Wraps `future` so its output lands in the returned [`JoinHandle`].
pub(crate) fn joinable<F>(future: F) -> (impl Future<Output = ()> + 'static, JoinHandle<F::Output>)
where
    F: Future + 'static,
    F::Output: 'static,
{
    let state = Rc::new(RefCell::new(JoinState {
        output: None,
        finished: false,
        waiter: None,
    }));

    let slot = state.clone();
    let task = async move {
        let output = future.await;

        let waiter = {
            let mut slot = slot.borrow_mut();
            slot.output = Some(output);
            slot.finished = true;
            slot.waiter.take()
        };

        if let Some(waker) = waiter {
            waker.wake();
        }
    };

    (task, JoinHandle { state })
}
