// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::time::Duration;

use tokio_retry::strategy::jitter;

/// Retry/backoff policy for index fetches, per spec §4.4 "Retry & backoff":
/// exponential backoff (`base * 2^attempt`, capped at 30s) with jitter,
/// bounded to `max_attempts`; 4xx responses are not retried except 408 and
/// 429.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            cap: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl RetryConfig {
    /// Delay strategy for `tokio_retry::Retry::spawn`: exponential, capped,
    /// jittered, truncated to `max_attempts`.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        let base = self.base;
        let cap = self.cap;
        (0..self.max_attempts).map(move |attempt| {
            let scaled = base.saturating_mul(1u32 << attempt.min(20));
            jitter(scaled.min(cap))
        })
    }

    /// Whether an HTTP status code should be retried: all non-4xx failure
    /// statuses, plus 408 (Request Timeout) and 429 (Too Many Requests)
    /// among the 4xx range.
    pub fn is_retryable_status(status: u16) -> bool {
        if !(400..500).contains(&status) {
            return true;
        }
        matches!(status, 408 | 429)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_retryable_4xx_is_rejected() {
        assert!(!RetryConfig::is_retryable_status(404));
        assert!(!RetryConfig::is_retryable_status(403));
    }

    #[test]
    fn retryable_4xx_exceptions_are_accepted() {
        assert!(RetryConfig::is_retryable_status(408));
        assert!(RetryConfig::is_retryable_status(429));
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(RetryConfig::is_retryable_status(500));
        assert!(RetryConfig::is_retryable_status(503));
    }

    #[test]
    fn strategy_is_capped_and_bounded_in_length() {
        let config = RetryConfig {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            max_attempts: 10,
        };
        let delays: Vec<_> = config.strategy().collect();
        assert_eq!(delays.len(), 10);
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(30)));
    }
}
