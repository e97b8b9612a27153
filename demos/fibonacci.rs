//! Computes a batch of Fibonacci numbers on a small pool.
//!
//! Every job reports its result over its own channel, and the driver waits for all of them.
//! Run with `RUST_LOG=tickpool=debug` to watch the dispatcher grow and shrink the pool.

use std::{num::NonZeroUsize, sync::mpsc, time::Instant};
use tickpool::{PoolConfig, ThreadPool};
use tracing_subscriber::{fmt, EnvFilter};

const CALCULATIONS: usize = 10;

fn fibonacci(n: u32) -> u64 {
    if n <= 1 {
        return n as u64;
    }

    fibonacci(n - 1) + fibonacci(n - 2)
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_thread_names(true)
        .init();

    let max_threads = NonZeroUsize::new(3).unwrap();
    let pool = ThreadPool::with_config(PoolConfig::new(max_threads).name("fib"));

    let started = Instant::now();

    let done: Vec<_> = (0..CALCULATIONS)
        .map(|i| {
            let n = 20 + (i as u32 * 7) % 20;
            let (tx, rx) = mpsc::channel();

            pool.spawn(move || {
                let _ = tx.send(fibonacci(n));
            });

            (n, rx)
        })
        .collect();

    let results: Vec<_> = done
        .into_iter()
        .map(|(n, rx)| (n, rx.recv().expect("job dropped its completion signal")))
        .collect();

    tracing::info!(elapsed = ?started.elapsed(), "all calculations are complete");

    for (n, fib) in results {
        println!("Fibonacci({n}) = {fib}");
    }

    if let Err(e) = pool.join() {
        tracing::error!(error = %e, "pool finished with failures");
    }

    println!("{:#?}", pool.stats());
}
