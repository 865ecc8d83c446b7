use super::queue::RunQueue;
use super::task::JoinHandle;
use super::task::handle::joinable;
use super::task::waker::TaskWaker;
use super::timer::{TimerQueue, TimerSlot};
use crate::utils::Slab;

use std::cell::RefCell;
use std::future::Future;
use std::mem;
use std::pin::{Pin, pin};
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Instant;

/// Id reserved for the future passed to [`Executor::block_on`].
const ROOT_TASK: usize = usize::MAX;

type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// A spawned task as stored in the task table.
struct TaskSlot {
    /// `None` while the task is being polled.
    future: Option<LocalTask>,
    waker: Arc<TaskWaker>,
}

/// Single-threaded task executor.
///
/// The `Executor` is responsible for:
/// - owning spawned tasks,
/// - polling woken tasks in wake order,
/// - firing timers,
/// - parking the thread when nothing is runnable.
pub(crate) struct Executor {
    tasks: RefCell<Slab<TaskSlot>>,
    queue: Arc<RunQueue>,
    timers: RefCell<TimerQueue>,

    /// Tasks polled between two timer sweeps.
    event_interval: usize,

    /// Panic instead of parking forever.
    stall_detection: bool,
}

impl Executor {
    pub(crate) fn new(event_interval: usize, stall_detection: bool) -> Self {
        Self {
            tasks: RefCell::new(Slab::with_capacity(64)),
            queue: Arc::new(RunQueue::new()),
            timers: RefCell::new(TimerQueue::new()),
            event_interval,
            stall_detection,
        }
    }

    /// Adds a task to the task table and schedules its first poll.
    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let (task, handle) = joinable(future);

        let waker = {
            let mut tasks = self.tasks.borrow_mut();
            let id = tasks.vacant_key();
            let waker = Arc::new(TaskWaker::new(id, self.queue.clone()));

            tasks.insert(TaskSlot {
                future: Some(Box::pin(task)),
                waker: waker.clone(),
            });

            log::trace!("spawned task {id}");
            waker
        };

        waker.schedule();
        handle
    }

    /// Arms a one-shot timer on this executor.
    pub(crate) fn register_timer(&self, deadline: Instant, waker: Waker) -> Rc<TimerSlot> {
        self.timers.borrow_mut().insert(deadline, waker)
    }

    /// Drives `future` and every spawned task until `future` completes.
    ///
    /// Must run inside [`enter_context`](super::context::enter_context).
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        let root = Arc::new(TaskWaker::new(ROOT_TASK, self.queue.clone()));
        let waker = Waker::from(root.clone());
        let mut cx = Context::from_waker(&waker);
        let mut future = pin!(future);

        root.schedule();

        loop {
            for _ in 0..self.event_interval {
                let Some(id) = self.queue.pop() else {
                    break;
                };

                if id != ROOT_TASK {
                    self.run_task(id);
                    continue;
                }

                if !root.begin_poll() {
                    continue;
                }

                if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                    root.complete();
                    return output;
                }

                root.end_poll();
            }

            let due = self.timers.borrow_mut().expire(Instant::now());
            for waker in due {
                waker.wake();
            }

            if !self.queue.is_empty() {
                continue;
            }

            let next_deadline = self.timers.borrow_mut().next_deadline();

            match next_deadline {
                Some(deadline) => self.queue.park_until(deadline),
                None if self.stall_detection => {
                    log::warn!(
                        "no runnable task and no armed timer, {} task(s) blocked",
                        self.tasks.borrow().len()
                    );
                    panic!("runtime stalled: the root future can never be woken");
                }
                None => self.queue.park(),
            }
        }
    }

    /// Polls task `id` once, if it is really queued.
    fn run_task(&self, id: usize) {
        let (mut future, waker) = {
            let mut tasks = self.tasks.borrow_mut();

            let Some(slot) = tasks.get_mut(id) else {
                return;
            };

            if !slot.waker.begin_poll() {
                return;
            }

            let Some(future) = slot.future.take() else {
                return;
            };

            (future, slot.waker.clone())
        };

        let task_waker = Waker::from(waker.clone());
        let mut cx = Context::from_waker(&task_waker);

        // The task table is not borrowed here, so the task may spawn.
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                waker.complete();
                self.tasks.borrow_mut().remove(id);
                log::trace!("task {id} completed");
            }
            Poll::Pending => {
                if let Some(slot) = self.tasks.borrow_mut().get_mut(id) {
                    slot.future = Some(future);
                }
                waker.end_poll();
            }
        }
    }

    /// Drops every unfinished task and disarms every timer.
    pub(crate) fn shutdown(&self) {
        let tasks = mem::replace(&mut *self.tasks.borrow_mut(), Slab::with_capacity(0));

        if !tasks.is_empty() {
            log::debug!("dropping {} unfinished task(s)", tasks.len());
        }

        // Dropped outside of the borrow: a task may release locks on drop.
        drop(tasks);
        self.timers.borrow_mut().clear();
    }
}
