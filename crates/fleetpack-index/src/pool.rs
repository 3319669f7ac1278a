// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::{Error, Result};

/// A unit of work for [`run_bounded`]: a boxed, already-constructed future
/// rather than a closure, so a `Vec` of jobs can mix distinct call sites.
pub type Job<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Runs `jobs` with at most `concurrency` running at a time, using a
/// semaphore-gated `JoinSet` rather than one task per job (spec §5/§9:
/// "bounded worker pool", not raw unbounded spawning). Returns results in
/// the same order as `jobs`, short-circuiting (and cancelling the rest) on
/// the first error.
pub async fn run_bounded<T>(jobs: Vec<Job<T>>, concurrency: usize) -> Result<Vec<T>>
where
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();
    for (index, job) in jobs.into_iter().enumerate() {
        let permit = semaphore.clone();
        set.spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore never closed");
            (index, job.await)
        });
    }

    let mut slots: Vec<Option<T>> = Vec::new();
    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        let (index, result) = match joined {
            Ok(pair) => pair,
            Err(join_err) if join_err.is_cancelled() => continue,
            Err(join_err) => {
                first_error.get_or_insert(Error::CacheIo {
                    path: "worker pool task".to_string(),
                    source: std::io::Error::other(join_err.to_string()),
                });
                continue;
            }
        };
        if slots.len() <= index {
            slots.resize_with(index + 1, || None);
        }
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(e) => {
                first_error.get_or_insert(e);
                set.abort_all();
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    Ok(slots.into_iter().map(|v| v.expect("every slot filled")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_all_jobs_and_preserves_order() {
        let jobs: Vec<Job<i32>> = (0..8)
            .map(|i| Box::pin(async move { Ok::<_, Error>(i * 10) }) as Job<i32>)
            .collect();
        let results = run_bounded(jobs, 3).await.unwrap();
        assert_eq!(results, (0..8).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn never_exceeds_the_concurrency_cap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let jobs: Vec<Job<()>> = (0..20)
            .map(|_| {
                let in_flight = in_flight.clone();
                let max_seen = max_seen.clone();
                Box::pin(async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, Error>(())
                }) as Job<()>
            })
            .collect();
        run_bounded(jobs, 4).await.unwrap();
        assert!(max_seen.load(Ordering::SeqCst) <= 4);
    }
}
