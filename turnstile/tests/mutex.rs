use turnstile::sync::{Mutex, TimeoutError};
use turnstile::time::sleep;
use turnstile::{RuntimeBuilder, join, task, yield_now};

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Debug, PartialEq)]
enum Failure {
    Timeout(TimeoutError),
    Rejected(&'static str),
}

impl From<TimeoutError> for Failure {
    fn from(err: TimeoutError) -> Self {
        Failure::Timeout(err)
    }
}

#[turnstile::test]
async fn test_acquire_free_mutex_is_immediate() {
    let mutex = Mutex::new();

    let guard = mutex.acquire(None).await.expect("free mutex");

    assert!(mutex.is_locked());
    assert_eq!(mutex.waiters(), 0);

    guard.release();
    assert!(!mutex.is_locked(), "Release without waiters should unlock");
}

#[turnstile::test]
async fn test_waiters_are_granted_in_arrival_order() {
    let mutex = Mutex::new();
    let order = RefCell::new(Vec::new());

    let holder = mutex.acquire(None).await.expect("free mutex");

    let mutex = &mutex;
    let order = &order;
    let worker = move |id: usize| async move {
        let guard = mutex.acquire(None).await.expect("no timeout");
        order.borrow_mut().push(id);
        yield_now().await;
        guard.release();
    };

    join!(
        async move {
            yield_now().await;
            assert_eq!(mutex.waiters(), 4);
            holder.release();
        },
        worker(1),
        worker(2),
        worker(3),
        worker(4)
    );

    assert_eq!(*order.borrow(), vec![1, 2, 3, 4]);
    assert!(!mutex.is_locked());
}

#[turnstile::test]
async fn test_release_hands_over_without_unlocking() {
    let mutex = Mutex::new();
    let holder = mutex.acquire(None).await.expect("free mutex");

    let mutex = &mutex;
    let ((), observed) = join!(
        async move {
            yield_now().await;
            holder.release();

            // The waiter owns the lock now, even before it runs again.
            assert!(mutex.is_locked());
            assert!(mutex.try_acquire().is_none(), "No barging after hand-over");
        },
        async move {
            let guard = mutex.acquire(None).await.expect("no timeout");
            guard.release();
            true
        }
    );

    assert!(observed);
    assert!(!mutex.is_locked());
}

#[turnstile::test]
async fn test_timed_out_waiter_leaves_the_queue() {
    let mutex = Mutex::new();
    let holder = mutex.acquire(None).await.expect("free mutex");

    let start = Instant::now();
    let err = mutex
        .acquire(Some(Duration::from_millis(50)))
        .await
        .expect_err("Lock is held for the whole wait");

    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(err.duration(), Duration::from_millis(50));
    assert_eq!(err.to_string(), "mutex acquire timed out after 50ms");
    assert_eq!(mutex.waiters(), 0, "Timed-out waiter must be removed");

    // The next release goes straight to a fresh waiter.
    let granted = Rc::new(Cell::new(false));
    let mutex = &mutex;
    let flag = granted.clone();
    join!(
        async move {
            let guard = mutex.acquire(None).await.expect("no timeout");
            flag.set(true);
            guard.release();
        },
        async move {
            yield_now().await;
            holder.release();
        }
    );

    assert!(granted.get());
    assert!(!mutex.is_locked());
}

#[turnstile::test]
async fn test_timeout_does_not_disturb_remaining_order() {
    let mutex = Mutex::new();
    let order = RefCell::new(Vec::new());
    let holder = mutex.acquire(None).await.expect("free mutex");

    let mutex = &mutex;
    let order = &order;

    join!(
        async move {
            mutex.acquire(None).await.expect("no timeout").release();
            order.borrow_mut().push("first");
        },
        async move {
            let result = mutex.acquire(Some(Duration::from_millis(20))).await;
            assert!(result.is_err());
            order.borrow_mut().push("timed out");
        },
        async move {
            mutex.acquire(None).await.expect("no timeout").release();
            order.borrow_mut().push("third");
        },
        async move {
            sleep(Duration::from_millis(60)).await;
            holder.release();
        }
    );

    assert_eq!(*order.borrow(), vec!["timed out", "first", "third"]);
}

#[turnstile::test]
async fn test_grant_before_deadline_wins() {
    let mutex = Mutex::new();
    let holder = mutex.acquire(None).await.expect("free mutex");

    let mutex = &mutex;
    let (result, ()) = join!(
        async move { mutex.acquire(Some(Duration::from_millis(500))).await.map(drop) },
        async move {
            sleep(Duration::from_millis(10)).await;
            holder.release();
        }
    );

    assert_eq!(result, Ok(()));
    assert!(!mutex.is_locked());
}

#[turnstile::test]
async fn test_timeout_window_starts_when_queued() {
    let mutex = Mutex::new();
    let holder = mutex.acquire(None).await.expect("free mutex");

    // Built long before it is awaited; the window has not started yet.
    let pending = mutex.acquire(Some(Duration::from_millis(40)));
    sleep(Duration::from_millis(60)).await;
    assert_eq!(mutex.waiters(), 0, "Not queued until first polled");

    let mutex = &mutex;
    let (result, ()) = join!(async move { pending.await.map(drop) }, async move {
        sleep(Duration::from_millis(10)).await;
        assert_eq!(mutex.waiters(), 1);
        holder.release();
    });

    assert_eq!(result, Ok(()));
    assert!(!mutex.is_locked());
}

#[turnstile::test]
async fn test_zero_timeout_on_free_mutex_succeeds() {
    let mutex = Mutex::new();

    let guard = mutex
        .acquire(Some(Duration::ZERO))
        .await
        .expect("A free mutex is granted without arming a timer");

    guard.release();
}

#[turnstile::test]
async fn test_run_exclusive_returns_operation_result() {
    let mutex = Mutex::new();
    let counter = Cell::new(0);

    let value = mutex
        .run_exclusive(None, || async {
            counter.set(counter.get() + 1);
            Ok::<_, Failure>(counter.get() * 10)
        })
        .await;

    assert_eq!(value, Ok(10));
    assert!(!mutex.is_locked());
}

#[turnstile::test]
async fn test_run_exclusive_releases_on_error() {
    let mutex = Mutex::new();

    let result: Result<(), Failure> = mutex
        .run_exclusive(None, || async { Err(Failure::Rejected("boom")) })
        .await;

    assert_eq!(result, Err(Failure::Rejected("boom")));
    assert!(!mutex.is_locked(), "Error path must release the lock");

    let guard = mutex.acquire(Some(Duration::from_millis(10))).await;
    assert!(guard.is_ok(), "Subsequent acquire must not deadlock");
}

#[turnstile::test]
async fn test_run_exclusive_surfaces_acquire_timeout() {
    let mutex = Mutex::new();
    let holder = mutex.acquire(None).await.expect("free mutex");
    let ran = Cell::new(false);

    let result: Result<(), Failure> = mutex
        .run_exclusive(Some(Duration::from_millis(20)), || async {
            ran.set(true);
            Ok(())
        })
        .await;

    match result {
        Err(Failure::Timeout(err)) => assert_eq!(err.duration(), Duration::from_millis(20)),
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(!ran.get(), "Operation must not run without the lock");

    holder.release();
}

#[test]
fn test_run_exclusive_releases_on_panic() {
    let mutex = Rc::new(Mutex::new());

    let runtime = RuntimeBuilder::new().build();
    let shared = mutex.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        runtime.block_on(async move {
            shared
                .run_exclusive(None, || async {
                    if shared.is_locked() {
                        panic!("operation failed");
                    }
                    Ok::<(), TimeoutError>(())
                })
                .await
        })
    }));
    drop(runtime);

    assert!(outcome.is_err(), "The panic must propagate");
    assert!(!mutex.is_locked(), "Unwinding must release the lock");

    let runtime = RuntimeBuilder::new().build();
    let acquired = runtime.block_on(async move {
        mutex
            .acquire(Some(Duration::from_millis(10)))
            .await
            .map(drop)
            .is_ok()
    });
    assert!(acquired);
}

#[turnstile::test]
async fn test_cancelled_waiter_is_skipped() {
    let mutex = Mutex::new();
    let holder = mutex.acquire(None).await.expect("free mutex");

    {
        let mut pending = std::pin::pin!(mutex.acquire(None));
        let polled = std::future::poll_fn(|cx| {
            use std::future::Future;
            std::task::Poll::Ready(pending.as_mut().poll(cx).is_pending())
        })
        .await;
        assert!(polled);
        assert_eq!(mutex.waiters(), 1);
    }

    assert_eq!(mutex.waiters(), 0, "Dropping a pending acquire withdraws it");

    holder.release();
    assert!(!mutex.is_locked());
}

#[turnstile::test]
async fn test_granted_but_dropped_waiter_passes_the_lock_on() {
    let mutex = Mutex::new();
    let holder = mutex.acquire(None).await.expect("free mutex");

    let mut first = Box::pin(mutex.acquire(None));
    std::future::poll_fn(|cx| {
        use std::future::Future;
        assert!(first.as_mut().poll(cx).is_pending());
        std::task::Poll::Ready(())
    })
    .await;

    let mutex_ref = &mutex;
    let (second, ()) = join!(
        async move { mutex_ref.acquire(None).await.map(drop) },
        async move {
            yield_now().await;
            // `first` is granted here but never polled again.
            holder.release();
            assert!(mutex_ref.is_locked());
            drop(first);
        }
    );

    assert_eq!(second, Ok(()));
    assert!(!mutex.is_locked());
}

#[turnstile::test]
async fn test_mutual_exclusion_across_tasks() {
    let mutex = Rc::new(Mutex::new());
    let inside = Rc::new(Cell::new(0usize));
    let total = Rc::new(Cell::new(0usize));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let mutex = mutex.clone();
            let inside = inside.clone();
            let total = total.clone();

            task::spawn(async move {
                for _ in 0..5 {
                    mutex
                        .run_exclusive(None, || async {
                            inside.set(inside.get() + 1);
                            assert_eq!(inside.get(), 1, "Two holders at once");
                            yield_now().await;
                            total.set(total.get() + 1);
                            inside.set(inside.get() - 1);
                            Ok::<_, TimeoutError>(())
                        })
                        .await
                        .expect("no timeout");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await;
    }

    assert_eq!(total.get(), 40);
    assert!(!mutex.is_locked());
}
