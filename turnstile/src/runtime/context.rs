use super::executor::Executor;

use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    /// Executor driving the current thread, if any.
    ///
    /// Installed for the duration of [`Runtime::block_on`](super::Runtime::block_on)
    /// so that [`spawn`](crate::task::spawn) and timers can reach the
    /// executor without explicit parameter passing.
    static CURRENT_EXECUTOR: RefCell<Option<Rc<Executor>>> = const { RefCell::new(None) };
}

/// Returns the executor of the runtime currently running on this thread.
pub(crate) fn current() -> Option<Rc<Executor>> {
    CURRENT_EXECUTOR.with(|cell| cell.borrow().clone())
}

/// Runs `f` with `executor` installed as the current executor.
///
/// The previous executor is restored afterwards, including when `f` unwinds.
pub(crate) fn enter_context<R>(executor: Rc<Executor>, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Rc<Executor>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            let _ = CURRENT_EXECUTOR.try_with(|cell| *cell.borrow_mut() = previous);
        }
    }

    let previous = CURRENT_EXECUTOR.with(|cell| cell.replace(Some(executor)));
    let _restore = Restore(previous);

    f()
}
