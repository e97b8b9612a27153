use crate::{PoolConfig, PoolError, ThreadPool};
use parking_lot::Mutex;
use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    },
    thread::{self},
    time::{Duration, Instant},
};

fn pool(max_threads: usize) -> ThreadPool {
    let config = PoolConfig::new(NonZeroUsize::new(max_threads).unwrap())
        .name("test")
        .poll_interval(Duration::from_millis(5));

    ThreadPool::with_config(config)
}

fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_thread_pool1() {
    let thread_count = 2;

    let tp = ThreadPool::new(thread_count.try_into().unwrap());

    let (tx, rx) = mpsc::channel();

    for _ in 0..thread_count {
        let tx = tx.clone();
        tp.spawn(move || {
            tx.send(1).unwrap();
        });
    }

    assert_eq!(rx.iter().take(thread_count).sum::<usize>(), thread_count);

    tp.join().unwrap();
}

#[test]
fn every_job_runs_exactly_once() {
    let tp = pool(4);
    let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..100).map(|_| AtomicUsize::new(0)).collect());

    for i in 0..100 {
        let runs = Arc::clone(&runs);
        tp.spawn(move || {
            runs[i].fetch_add(1, Ordering::SeqCst);
        });
    }

    tp.join().unwrap();

    assert!(runs.iter().all(|n| n.load(Ordering::SeqCst) == 1));
    assert_eq!(tp.total_queued(), 100);
    assert_eq!(tp.slot_count(), 0);
}

#[test]
fn ten_tasks_on_three_threads() {
    let tp = pool(3);
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();

    for i in 0..10 {
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        let tx = tx.clone();

        tp.spawn(move || {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            current.fetch_sub(1, Ordering::SeqCst);
            tx.send(i).unwrap();
        });
    }

    let mut done: Vec<i32> = rx.iter().take(10).collect();
    done.sort_unstable();
    assert_eq!(done, (0..10).collect::<Vec<_>>());

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(tp.live_threads() <= 3);

    tp.join().unwrap();

    assert_eq!(tp.used_threads(), 3);
    assert_eq!(tp.finished_threads(), 0);
    assert_eq!(tp.slot_count(), 0);
    assert_eq!(tp.total_queued(), 10);
}

#[test]
fn single_thread_runs_in_submission_order() {
    let tp = pool(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..20 {
        let order = Arc::clone(&order);
        tp.spawn(move || {
            order.lock().push(i);
            thread::sleep(Duration::from_millis(1));
        });
    }

    tp.join().unwrap();

    assert_eq!(*order.lock(), (0..20).collect::<Vec<_>>());
    assert_eq!(tp.used_threads(), 1);
}

#[test]
fn jobs_start_in_submission_order_within_capacity() {
    let tp = pool(3);
    let started = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let started = Arc::clone(&started);
        tp.spawn(move || {
            started.lock().push(i);
            // Keep the worker busy so the next job goes to a new thread
            thread::sleep(Duration::from_millis(50));
        });
    }

    tp.join().unwrap();

    assert_eq!(*started.lock(), vec![0, 1, 2]);
    assert_eq!(tp.used_threads(), 3);
}

#[test]
fn absent_job_is_rejected() {
    let tp = pool(2);

    let err = tp.submit(None).unwrap_err();
    assert!(matches!(err, PoolError::InvalidArgument(_)));
    assert_eq!(tp.total_queued(), 0);

    tp.submit(Some(Box::new(|| {}))).unwrap();
    assert_eq!(tp.total_queued(), 1);

    tp.join().unwrap();
}

#[test]
fn idle_workers_are_reaped() {
    let tp = pool(3);
    let (tx, rx) = mpsc::channel();

    for _ in 0..6 {
        let tx = tx.clone();
        tp.spawn(move || {
            thread::sleep(Duration::from_millis(10));
            tx.send(()).unwrap();
        });
    }

    rx.iter().take(6).for_each(drop);

    wait_for("workers to be reaped", || tp.slot_count() == 0);
    assert_eq!(tp.finished_threads(), 0);
    assert_eq!(tp.live_threads(), 0);
}

#[test]
fn counters_stay_consistent() {
    let tp = pool(2);
    let mut last_used = 0;

    for _ in 0..30 {
        tp.spawn(|| thread::sleep(Duration::from_millis(2)));

        let stats = tp.stats();
        assert!(stats.finished_threads <= stats.slots);
        assert!(stats.slots <= stats.max_threads);
        assert!(stats.used_threads >= last_used);
        assert!(stats.used_threads <= stats.max_threads);
        last_used = stats.used_threads;
    }

    tp.join().unwrap();

    let stats = tp.stats();
    assert_eq!(stats.total_queued, 30);
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.finished_threads, 0);
    assert!(stats.used_threads >= last_used);
}

#[test]
fn pool_serves_work_again_after_going_idle() {
    let tp = pool(2);
    let (tx, rx) = mpsc::channel();

    let first = tx.clone();
    tp.spawn(move || first.send(1).unwrap());
    tp.join().unwrap();

    tp.spawn(move || tx.send(2).unwrap());
    tp.join().unwrap();

    assert_eq!(rx.iter().take(2).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_thread_pool_panic() {
    let tp = pool(1);
    let (tx, rx) = mpsc::channel();

    tp.spawn(|| {
        thread::sleep(Duration::from_millis(20));
        panic!("boom");
    });

    for i in 0..3 {
        let tx = tx.clone();
        tp.spawn(move || tx.send(i).unwrap());
    }

    assert_eq!(rx.iter().take(3).collect::<Vec<_>>(), vec![0, 1, 2]);

    let err = tp.join().unwrap_err();
    assert_eq!(err.panicked(), 1);
}

#[test]
fn panic_is_reported_by_one_join_only() {
    let tp = pool(2);

    tp.spawn(|| panic!("boom"));
    assert_eq!(tp.join().unwrap_err().panicked(), 1);

    let (tx, rx) = mpsc::channel();
    tp.spawn(move || tx.send(()).unwrap());
    tp.join().unwrap();

    rx.recv_timeout(Duration::from_secs(1)).unwrap();
}

#[test]
fn dropped_pool_still_runs_queued_jobs() {
    let (tx, rx) = mpsc::channel();

    {
        let tp = pool(2);
        for i in 0..5 {
            let tx = tx.clone();
            tp.spawn(move || tx.send(i).unwrap());
        }
    }

    let mut got: Vec<i32> = rx.iter().take(5).collect();
    got.sort_unstable();
    assert_eq!(got, vec![0, 1, 2, 3, 4]);
}

#[test]
fn clones_share_the_pool() {
    let tp = pool(2);
    let other = tp.clone();

    other.spawn(|| {});
    tp.spawn(|| {});

    tp.join().unwrap();
    assert_eq!(other.total_queued(), 2);
}
