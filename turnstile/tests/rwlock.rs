use turnstile::sync::RwLock;
use turnstile::time::timeout;
use turnstile::{RuntimeBuilder, join, task, yield_now};

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

#[turnstile::test]
async fn test_readers_share_the_lock() {
    let lock = RwLock::new();

    let a = lock.read().await;
    let b = lock.read().await;

    assert_eq!(lock.readers(), 2);
    assert!(lock.try_write().is_none(), "Writer must wait for readers");
    assert_eq!(lock.waiters(), 0, "try_write never queues");

    a.release();
    b.release();

    let w = lock.try_write().expect("lock is free");
    assert!(lock.is_write_locked());
    w.release();
    assert!(!lock.is_write_locked());
}

#[turnstile::test]
async fn test_writer_excludes_everyone() {
    let lock = RwLock::new();

    let w = lock.write().await;

    assert!(lock.try_read().is_none());
    assert!(lock.try_write().is_none());
    assert_eq!(lock.readers(), 0);

    w.release();
    assert!(lock.try_read().is_some());
}

#[turnstile::test]
async fn test_read_queues_behind_waiting_writer() {
    let lock = RwLock::new();
    let order = RefCell::new(Vec::new());

    // A holds the write lock, B queues for writing, C for reading.
    let a = lock.write().await;
    assert!(lock.is_write_locked());

    let lock = &lock;
    let order = &order;
    join!(
        async move {
            let b = lock.write().await;
            order.borrow_mut().push("B");
            b.release();
        },
        async move {
            let c = lock.read().await;
            order.borrow_mut().push("C");
            c.release();
        },
        async move {
            yield_now().await;
            assert_eq!(lock.waiters(), 2);
            a.release();

            // B owns the lock; C still waits behind it.
            assert!(lock.is_write_locked());
            assert_eq!(lock.readers(), 0);
            assert_eq!(lock.waiters(), 1);
        }
    );

    assert_eq!(*order.borrow(), vec!["B", "C"]);
    assert_eq!((lock.readers(), lock.is_write_locked()), (0, false));
}

#[turnstile::test]
async fn test_waiting_writer_is_not_starved_by_new_readers() {
    let lock = RwLock::new();
    let order = RefCell::new(Vec::new());

    let r1 = lock.read().await;

    let lock = &lock;
    let order = &order;
    join!(
        async move {
            let w = lock.write().await;
            order.borrow_mut().push("W");
            yield_now().await;
            w.release();
        },
        async move {
            yield_now().await;

            // Readers still hold the lock, but a writer is queued.
            assert!(lock.try_read().is_none());

            let r2 = lock.read().await;
            order.borrow_mut().push("R2");
            r2.release();
        },
        async move {
            yield_now().await;
            yield_now().await;
            assert_eq!(lock.readers(), 1);
            assert_eq!(lock.waiters(), 2);
            r1.release();
        }
    );

    assert_eq!(*order.borrow(), vec!["W", "R2"]);
}

#[turnstile::test]
async fn test_release_grants_leading_readers_as_a_batch() {
    let lock = RwLock::new();
    let order = RefCell::new(Vec::new());

    let w = lock.write().await;

    let lock = &lock;
    let order = &order;
    let reader = move |name: &'static str| async move {
        let guard = lock.read().await;
        order.borrow_mut().push(name);
        yield_now().await;
        guard.release();
    };
    let writer = move |name: &'static str| async move {
        let guard = lock.write().await;
        assert_eq!(lock.readers(), 0);
        order.borrow_mut().push(name);
        yield_now().await;
        guard.release();
    };

    join!(
        reader("r1"),
        reader("r2"),
        writer("w2"),
        reader("r3"),
        async move {
            yield_now().await;
            assert_eq!(lock.waiters(), 4);
            w.release();

            assert_eq!(lock.readers(), 2, "Both leading readers are granted");
            assert!(!lock.is_write_locked());
            assert_eq!(lock.waiters(), 2, "Draining stops at the writer");
        }
    );

    assert_eq!(*order.borrow(), vec!["r1", "r2", "w2", "r3"]);
    assert_eq!((lock.readers(), lock.waiters()), (0, 0));
}

#[turnstile::test]
async fn test_abandoned_writer_unblocks_readers_behind_it() {
    let lock = RwLock::new();
    let r1 = lock.read().await;

    let lock = &lock;
    let (timed_out, readers) = join!(
        async move {
            let timed_out = timeout(Duration::from_millis(20), lock.write()).await.is_err();
            timed_out
        },
        async move {
            yield_now().await;
            let r2 = lock.read().await;
            let readers = lock.readers();
            r2.release();
            readers
        }
    );

    assert!(timed_out);
    assert_eq!(readers, 2, "Queued reader joins the active one");
    assert_eq!(lock.waiters(), 0);

    r1.release();
    assert_eq!(lock.readers(), 0);
}

#[turnstile::test]
async fn test_run_write_then_run_read() {
    let lock = RwLock::new();
    let value = Cell::new(0);

    lock.run_write(|| async {
        assert!(lock.is_write_locked());
        value.set(5);
    })
    .await;

    let seen = lock
        .run_read(|| async {
            assert_eq!(lock.readers(), 1);
            value.get()
        })
        .await;

    assert_eq!(seen, 5);
    assert_eq!((lock.readers(), lock.is_write_locked()), (0, false));
}

#[test]
fn test_run_write_releases_on_panic() {
    let lock = Rc::new(RwLock::new());

    let runtime = RuntimeBuilder::new().build();
    let shared = lock.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        runtime.block_on(async move {
            shared
                .run_write(|| async {
                    if shared.is_write_locked() {
                        panic!("operation failed");
                    }
                })
                .await
        })
    }));
    drop(runtime);

    assert!(outcome.is_err(), "The panic must propagate");
    assert!(!lock.is_write_locked(), "Unwinding must release the lock");
    assert!(lock.try_read().is_some());
}

#[turnstile::test]
async fn test_readers_and_writers_never_overlap() {
    let lock = Rc::new(RwLock::new());
    let reading = Rc::new(Cell::new(0usize));
    let writing = Rc::new(Cell::new(0usize));
    let writes = Rc::new(Cell::new(0usize));

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let lock = lock.clone();
            let reading = reading.clone();
            let writing = writing.clone();
            let writes = writes.clone();

            task::spawn(async move {
                for _ in 0..4 {
                    if i % 3 == 0 {
                        let guard = lock.write().await;
                        assert_eq!(reading.get(), 0, "Writer alongside readers");
                        assert_eq!(writing.get(), 0, "Two writers at once");
                        writing.set(1);
                        yield_now().await;
                        writes.set(writes.get() + 1);
                        writing.set(0);
                        guard.release();
                    } else {
                        let guard = lock.read().await;
                        assert_eq!(writing.get(), 0, "Reader alongside a writer");
                        reading.set(reading.get() + 1);
                        yield_now().await;
                        reading.set(reading.get() - 1);
                        guard.release();
                    }
                    yield_now().await;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await;
    }

    assert_eq!(writes.get(), 16);
    assert_eq!((lock.readers(), lock.is_write_locked(), lock.waiters()), (0, false, 0));
}
