//! Bounded fan-out for bulk operations.
//!
//! # Design
//! - `run_batch` drives at most `concurrency` lanes on the calling task; lanes
//!   pull the next item from a shared cursor so a slow item never blocks the
//!   rest.
//! - `run_chunked` settles one fixed-size chunk before starting the next and
//!   pauses between chunks.
//! - Item failures are collected; a batch never fails as a whole.
//! - Dropping the returned future cancels every in-flight item.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::join_all;

/// Item that failed, with its error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure<I, E> {
    /// Input item.
    pub item: I,
    /// Why it failed.
    pub error: E,
}

/// Settled results of a batch, both lists in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<I, R, E> {
    /// Successful results.
    pub ok: Vec<R>,
    /// Failed items.
    pub failed: Vec<BatchFailure<I, E>>,
}

impl<I, R, E> BatchOutcome<I, R, E> {
    const fn new() -> Self {
        Self {
            ok: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn record(&mut self, item: I, result: Result<R, E>) {
        match result {
            Ok(value) => self.ok.push(value),
            Err(error) => self.failed.push(BatchFailure { item, error }),
        }
    }

    /// Number of settled items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ok.len() + self.failed.len()
    }

    /// Whether the batch had no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run `worker` over `items` with at most `concurrency` calls in flight.
pub async fn run_batch<I, R, E, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    worker: F,
) -> BatchOutcome<I, R, E>
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let lanes = concurrency.max(1).min(items.len());
    let cursor = AtomicUsize::new(0);
    let shared = (&items, &cursor, &worker);

    let settled = join_all((0..lanes).map(|_| async move {
        let (items, cursor, worker) = shared;
        let mut done = Vec::new();
        loop {
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(index) else {
                break;
            };
            done.push((index, worker(item.clone()).await));
        }
        done
    }))
    .await;

    let mut settled: Vec<(usize, Result<R, E>)> = settled.into_iter().flatten().collect();
    settled.sort_by_key(|(index, _)| *index);

    let mut outcome = BatchOutcome::new();
    for ((_, result), item) in settled.into_iter().zip(items) {
        outcome.record(item, result);
    }
    outcome
}

/// Run `worker` over `items` in chunks of `chunk_size`, waiting `pause`
/// between chunks.
pub async fn run_chunked<I, R, E, F, Fut>(
    items: Vec<I>,
    chunk_size: usize,
    pause: Duration,
    worker: F,
) -> BatchOutcome<I, R, E>
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut outcome = BatchOutcome::new();
    let mut chunks = items.chunks(chunk_size.max(1)).peekable();
    while let Some(chunk) = chunks.next() {
        let results = join_all(chunk.iter().map(|item| worker(item.clone()))).await;
        for (item, result) in chunk.iter().cloned().zip(results) {
            outcome.record(item, result);
        }
        if chunks.peek().is_some() && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    outcome
}
