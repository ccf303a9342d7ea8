// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Injectable sleeping, so backoff and human-like pauses can be observed
//! in tests without waiting on the wall clock.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Suspends the current task.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Backoff for rate-limited or forbidden responses: `2^attempt` seconds.
pub fn exponential_backoff(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt.min(16)))
}

/// A uniformly random delay in `[min_ms, max_ms]`.
pub fn jittered(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_doubles() {
        assert_eq!(exponential_backoff(1), Duration::from_secs(2));
        assert_eq!(exponential_backoff(2), Duration::from_secs(4));
        assert_eq!(exponential_backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_jittered_within_bounds() {
        for _ in 0..50 {
            let d = jittered(1000, 2500);
            assert!(d >= Duration::from_millis(1000));
            assert!(d <= Duration::from_millis(2500));
        }
        assert_eq!(jittered(5, 5), Duration::from_millis(5));
    }
}
