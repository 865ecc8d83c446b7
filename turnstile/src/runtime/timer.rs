use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::task::Waker;
use std::time::Instant;

/// State shared between an armed timer and the future that armed it.
pub(crate) struct TimerSlot {
    /// Waker to notify when the deadline is reached.
    waker: RefCell<Option<Waker>>,

    /// Set when the owning future goes away. A cancelled timer never fires.
    cancelled: Cell<bool>,

    /// Whether the entry still sits in the heap.
    queued: Cell<bool>,

    /// Cancelled entries still in the heap, shared with the owning queue.
    dead: Rc<Cell<usize>>,
}

impl TimerSlot {
    /// Replaces the stored waker if it would wake a different task.
    pub(crate) fn set_waker(&self, waker: &Waker) {
        let mut slot = self.waker.borrow_mut();

        match slot.as_ref() {
            Some(current) if current.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        }
    }

    pub(crate) fn cancel(&self) {
        if !self.cancelled.replace(true) && self.queued.get() {
            self.dead.set(self.dead.get() + 1);
        }
        self.waker.borrow_mut().take();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Marks the entry as gone from the heap.
    fn dequeue(&self) {
        if self.queued.replace(false) && self.is_cancelled() {
            self.dead.set(self.dead.get().saturating_sub(1));
        }
    }
}

/// An entry in the timer queue.
struct TimerEntry {
    deadline: Instant,

    /// Registration order, used to break deadline ties.
    seq: u64,

    slot: Rc<TimerSlot>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Reversed so that `BinaryHeap<TimerEntry>` pops the earliest deadline
    /// first, and among equal deadlines the earliest registration.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One-shot timers owned by the runtime thread.
///
/// Cancelled timers are dropped lazily. Once they make up more than half of
/// the heap it is rebuilt without them, so timers abandoned long before
/// their deadline do not pile up.
pub(crate) struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,

    /// Number of cancelled entries still in `heap`.
    dead: Rc<Cell<usize>>,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            dead: Rc::new(Cell::new(0)),
        }
    }

    /// Arms a timer firing at `deadline`.
    pub(crate) fn insert(&mut self, deadline: Instant, waker: Waker) -> Rc<TimerSlot> {
        self.compact();

        let slot = Rc::new(TimerSlot {
            waker: RefCell::new(Some(waker)),
            cancelled: Cell::new(false),
            queued: Cell::new(true),
            dead: self.dead.clone(),
        });

        self.heap.push(TimerEntry {
            deadline,
            seq: self.next_seq,
            slot: slot.clone(),
        });
        self.next_seq += 1;

        slot
    }

    /// Pops every timer due at `now` and returns the wakers to notify.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<Waker> {
        let mut due = Vec::new();

        while let Some(entry) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }

            if let Some(entry) = self.heap.pop() {
                entry.slot.dequeue();

                if entry.slot.is_cancelled() {
                    continue;
                }

                if let Some(waker) = entry.slot.waker.borrow_mut().take() {
                    due.push(waker);
                }
            }
        }

        due
    }

    /// Deadline of the earliest live timer. Cancelled timers at the front are
    /// discarded on the way.
    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        self.compact();

        while let Some(entry) = self.heap.peek() {
            if !entry.slot.is_cancelled() {
                return Some(entry.deadline);
            }

            if let Some(entry) = self.heap.pop() {
                entry.slot.dequeue();
            }
        }

        None
    }

    /// Rebuilds the heap without cancelled entries once they are the majority.
    fn compact(&mut self) {
        let dead = self.dead.get();

        if dead == 0 || dead * 2 <= self.heap.len() {
            return;
        }

        self.heap.retain(|entry| {
            let live = !entry.slot.is_cancelled();
            if !live {
                entry.slot.dequeue();
            }
            live
        });

        log::trace!("dropped {dead} cancelled timer(s), {} left", self.heap.len());
    }

    pub(crate) fn clear(&mut self) {
        for entry in self.heap.drain() {
            entry.slot.dequeue();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.heap.len()
    }
}
