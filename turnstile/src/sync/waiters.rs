use crate::utils::Slab;

use std::collections::VecDeque;
use std::mem;
use std::task::Waker;

enum Status {
    /// Queued. Holds the waker of the suspended task.
    Waiting(Waker),

    /// Ownership was handed over; the task has not observed it yet.
    Granted,
}

struct Waiter<K> {
    kind: K,
    status: Status,
}

/// FIFO queue of suspended lock requests.
///
/// Requests are plain records addressed by key; the lock owns the queue and
/// decides when to grant. A record lives until the requesting future removes
/// it, either after observing its grant or when it is cancelled, so keys are
/// never reused under a live future.
pub(crate) struct WaitQueue<K> {
    waiters: Slab<Waiter<K>>,

    /// Keys of the `Waiting` records, in arrival order.
    order: VecDeque<usize>,
}

impl<K: Copy> WaitQueue<K> {
    pub(crate) fn new() -> Self {
        Self {
            waiters: Slab::with_capacity(0),
            order: VecDeque::new(),
        }
    }

    /// Number of requests still waiting for a grant.
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Appends a request and returns its key.
    pub(crate) fn push(&mut self, kind: K, waker: Waker) -> usize {
        let key = self.waiters.insert(Waiter {
            kind,
            status: Status::Waiting(waker),
        });
        self.order.push_back(key);

        key
    }

    /// Kind of the oldest waiting request.
    pub(crate) fn front(&self) -> Option<K> {
        let key = *self.order.front()?;
        self.waiters.get(key).map(|waiter| waiter.kind)
    }

    /// Grants the oldest waiting request and returns the waker to notify.
    pub(crate) fn grant_front(&mut self) -> Option<Waker> {
        let key = self.order.pop_front()?;
        let waiter = self.waiters.get_mut(key)?;

        match mem::replace(&mut waiter.status, Status::Granted) {
            Status::Waiting(waker) => Some(waker),
            Status::Granted => None,
        }
    }

    pub(crate) fn is_granted(&self, key: usize) -> bool {
        matches!(
            self.waiters.get(key),
            Some(Waiter {
                status: Status::Granted,
                ..
            })
        )
    }

    /// Stores `waker` if the request is still waiting under another one.
    pub(crate) fn refresh(&mut self, key: usize, waker: &Waker) {
        if let Some(Waiter {
            status: Status::Waiting(current),
            ..
        }) = self.waiters.get_mut(key)
        {
            if !current.will_wake(waker) {
                *current = waker.clone();
            }
        }
    }

    /// Removes a request wherever it is.
    ///
    /// Returns `Some(true)` if it had been granted, `Some(false)` if it was
    /// still waiting, `None` for an unknown key.
    pub(crate) fn remove(&mut self, key: usize) -> Option<bool> {
        let waiter = self.waiters.remove(key)?;

        match waiter.status {
            Status::Granted => Some(true),
            Status::Waiting(_) => {
                self.order.retain(|queued| *queued != key);
                Some(false)
            }
        }
    }
}
