//! Read-write lock with writer preference.
//!
//! Many readers or one writer, never both. Requests that cannot be admitted
//! wait in a single FIFO queue shared by both kinds.
//!
//! # Admission
//!
//! | Request | Granted immediately iff                              |
//! |---------|------------------------------------------------------|
//! | read    | no writer holds the lock and no write request queued |
//! | write   | no writer holds the lock and no reader holds it      |
//!
//! The read rule is what keeps writers from starving: once a writer is
//! queued, readers arriving later queue behind it even while other readers
//! still hold the lock.
//!
//! # Draining
//!
//! After every release the queue is drained from the front: every leading
//! read request is granted as a batch, then at most one write request if
//! the lock is completely free.

use super::error::MisuseError;
use super::waiters::WaitQueue;

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

struct State {
    /// Outstanding read guards.
    readers: usize,

    /// Whether a write guard is outstanding.
    writer: bool,

    /// Write requests still waiting in `queue`.
    queued_writes: usize,

    queue: WaitQueue<Access>,
}

impl State {
    fn new() -> Self {
        Self {
            readers: 0,
            writer: false,
            queued_writes: 0,
            queue: WaitQueue::new(),
        }
    }

    /// Takes the lock for `access` if the admission rule allows it.
    fn try_admit(&mut self, access: Access) -> bool {
        match access {
            Access::Read if !self.writer && self.queued_writes == 0 => {
                self.readers += 1;
                true
            }
            Access::Write if !self.writer && self.readers == 0 => {
                self.writer = true;
                true
            }
            _ => false,
        }
    }

    /// Queues a request that could not be admitted.
    fn enqueue(&mut self, access: Access, waker: Waker) -> usize {
        if access == Access::Write {
            self.queued_writes += 1;
        }
        self.queue.push(access, waker)
    }

    /// Drops request `key` from the queue.
    ///
    /// Returns `Some(true)` if it had already been granted.
    fn withdraw(&mut self, key: usize, access: Access) -> Option<bool> {
        let granted = self.queue.remove(key)?;

        if !granted && access == Access::Write {
            self.queued_writes -= 1;
        }
        Some(granted)
    }

    /// Gives back one `access` and returns the wakers of the requests
    /// granted as a consequence.
    fn release(&mut self, access: Access) -> Result<Vec<Waker>, MisuseError> {
        match access {
            Access::Read => {
                if self.readers == 0 {
                    return Err(MisuseError::ReadUnlock);
                }
                self.readers -= 1;
            }
            Access::Write => {
                if !self.writer {
                    return Err(MisuseError::WriteUnlock);
                }
                self.writer = false;
            }
        }

        Ok(self.process_queue())
    }

    /// Grants every leading read request, then at most one write request.
    fn process_queue(&mut self) -> Vec<Waker> {
        let mut granted = Vec::new();

        while !self.writer && self.queue.front() == Some(Access::Read) {
            let Some(waker) = self.queue.grant_front() else {
                break;
            };
            self.readers += 1;
            granted.push(waker);
        }

        if self.queue.front() == Some(Access::Write) && self.readers == 0 && !self.writer {
            if let Some(waker) = self.queue.grant_front() {
                self.writer = true;
                self.queued_writes -= 1;
                granted.push(waker);
            }
        }

        if !granted.is_empty() {
            log::trace!(
                "rwlock granted {} queued request(s), readers={}, writer={}",
                granted.len(),
                self.readers,
                self.writer
            );
        }

        granted
    }
}

/// A fair asynchronous read-write lock.
///
/// Like [`Mutex`](super::Mutex), it does not wrap the data it protects.
/// There is no built-in timeout; wrap [`read`](Self::read) or
/// [`write`](Self::write) in [`time::timeout`](crate::time::timeout) to
/// bound a wait. A request abandoned that way leaves the queue.
///
/// # Example
///
/// ```rust,ignore
/// let lock = RwLock::new();
///
/// let a = lock.read().await;
/// let b = lock.read().await; // readers share the lock
/// drop((a, b));
///
/// let w = lock.write().await; // exclusive
/// w.release();
/// ```
pub struct RwLock {
    state: RefCell<State>,
}

impl RwLock {
    /// Creates an unlocked lock with an empty queue.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::new()),
        }
    }

    /// Acquires shared access.
    ///
    /// Granted on the first poll unless a writer holds the lock or a write
    /// request is queued; otherwise the caller queues.
    pub fn read(&self) -> ReadLock<'_> {
        ReadLock {
            request: Request::new(self, Access::Read),
        }
    }

    /// Acquires exclusive access.
    ///
    /// Granted on the first poll if nobody holds the lock; otherwise the
    /// caller queues.
    pub fn write(&self) -> WriteLock<'_> {
        WriteLock {
            request: Request::new(self, Access::Write),
        }
    }

    /// Acquires shared access only if the read admission rule allows it now.
    pub fn try_read(&self) -> Option<ReadGuard<'_>> {
        self.state
            .borrow_mut()
            .try_admit(Access::Read)
            .then(|| ReadGuard { lock: self })
    }

    /// Acquires exclusive access only if the lock is free now.
    pub fn try_write(&self) -> Option<WriteGuard<'_>> {
        self.state
            .borrow_mut()
            .try_admit(Access::Write)
            .then(|| WriteGuard { lock: self })
    }

    /// Runs `operation` with shared access and releases it afterwards,
    /// including when `operation` panics.
    pub async fn run_read<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.read().await;
        let output = operation().await;
        guard.release();

        output
    }

    /// Runs `operation` with exclusive access and releases it afterwards,
    /// including when `operation` panics.
    pub async fn run_write<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.write().await;
        let output = operation().await;
        guard.release();

        output
    }

    /// Number of outstanding read guards.
    pub fn readers(&self) -> usize {
        self.state.borrow().readers
    }

    /// Whether a write guard is outstanding.
    pub fn is_write_locked(&self) -> bool {
        self.state.borrow().writer
    }

    /// Number of queued requests of either kind.
    pub fn waiters(&self) -> usize {
        self.state.borrow().queue.len()
    }

    fn unlock(&self, access: Access) {
        let released = self.state.borrow_mut().release(access);

        match released {
            Ok(granted) => granted.into_iter().for_each(Waker::wake),
            Err(err) => panic!("{err}"),
        }
    }
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("RwLock");

        match self.state.try_borrow() {
            Ok(state) => d
                .field("readers", &state.readers)
                .field("writer", &state.writer)
                .field("waiters", &state.queue.len()),
            Err(_) => d.field("state", &format_args!("<borrowed>")),
        };

        d.finish()
    }
}

/// A pending read or write request.
struct Request<'a> {
    lock: &'a RwLock,
    access: Access,

    /// Queue key, while queued or granted but not yet observed.
    key: Option<usize>,
}

impl<'a> Request<'a> {
    fn new(lock: &'a RwLock, access: Access) -> Self {
        Self {
            lock,
            access,
            key: None,
        }
    }

    fn poll_grant(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.lock.state.borrow_mut();

        match self.key {
            None => {
                if state.try_admit(self.access) {
                    return Poll::Ready(());
                }

                let key = state.enqueue(self.access, cx.waker().clone());
                log::trace!("rwlock busy, queued {:?} request {key}", self.access);

                self.key = Some(key);
                Poll::Pending
            }
            Some(key) => {
                if state.queue.is_granted(key) {
                    state.withdraw(key, self.access);
                    self.key = None;
                    return Poll::Ready(());
                }

                state.queue.refresh(key, cx.waker());
                Poll::Pending
            }
        }
    }
}

impl Drop for Request<'_> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        let granted = {
            let mut state = self.lock.state.borrow_mut();

            match state.withdraw(key, self.access) {
                Some(true) => {
                    log::debug!("cancelled {:?} request {key} was already granted", self.access);
                    state.release(self.access)
                }
                _ => {
                    // A removed write request may have been holding back reads.
                    log::debug!("{:?} request {key} cancelled", self.access);
                    Ok(state.process_queue())
                }
            }
        };

        match granted {
            Ok(granted) => granted.into_iter().for_each(Waker::wake),
            Err(err) => panic!("{err}"),
        }
    }
}

/// Future returned by [`RwLock::read`].
#[must_use = "futures do nothing unless polled"]
pub struct ReadLock<'a> {
    request: Request<'a>,
}

impl<'a> Future for ReadLock<'a> {
    type Output = ReadGuard<'a>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        this.request.poll_grant(cx).map(|()| ReadGuard {
            lock: this.request.lock,
        })
    }
}

/// Future returned by [`RwLock::write`].
#[must_use = "futures do nothing unless polled"]
pub struct WriteLock<'a> {
    request: Request<'a>,
}

impl<'a> Future for WriteLock<'a> {
    type Output = WriteGuard<'a>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        this.request.poll_grant(cx).map(|()| WriteGuard {
            lock: this.request.lock,
        })
    }
}

/// Release handle for shared access to a [`RwLock`].
#[must_use = "if unused the RwLock will immediately unlock"]
pub struct ReadGuard<'a> {
    lock: &'a RwLock,
}

impl ReadGuard<'_> {
    /// Gives back shared access.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock(Access::Read);
    }
}

impl fmt::Debug for ReadGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadGuard").finish_non_exhaustive()
    }
}

/// Release handle for exclusive access to a [`RwLock`].
#[must_use = "if unused the RwLock will immediately unlock"]
pub struct WriteGuard<'a> {
    lock: &'a RwLock,
}

impl WriteGuard<'_> {
    /// Gives back exclusive access.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock(Access::Write);
    }
}

impl fmt::Debug for WriteGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteGuard").finish_non_exhaustive()
    }
}
