// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

/// A small per-backend retry budget: `max_attempts` tries with an
/// exponential (2^n) backoff from `base_delay`, jittered. Grounded on
/// `fleetpack-index::retry` but kept local since each backend's retry
/// knobs (§4.7) come from a different part of `RunConfig`.
#[derive(Clone, Copy, Debug)]
pub struct RetryBudget {
    pub base_delay: Duration,
    pub max_attempts: usize,
}

impl RetryBudget {
    pub fn new(base_delay: Duration, max_attempts: usize) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    pub async fn run<T, E, F, Fut>(&self, action: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let strategy = ExponentialBackoff::from_millis(self.base_delay.as_millis().max(1) as u64)
            .map(jitter)
            .take(self.max_attempts.max(1));
        Retry::spawn(strategy, action).await
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), 3)
    }
}
