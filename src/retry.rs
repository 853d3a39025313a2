//! Generic retry with exponential backoff for flaky upstream calls.

use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// How a fallible operation is retried: one initial call plus `retries`
/// retries, sleeping `initial_delay * backoff_factor^k` between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        use crate::util::env as env_util;
        Self {
            retries: env_util::env_parse("FETCH_RETRIES", 3u32),
            initial_delay: Duration::from_millis(env_util::env_parse(
                "FETCH_RETRY_DELAY_MS",
                1000u64,
            )),
            backoff_factor: env_util::env_parse("FETCH_RETRY_BACKOFF", 2.0f64),
        }
    }
}

/// Run `op` until it succeeds or the policy is exhausted, then propagate the
/// final error. Callers encode permanent outcomes (e.g. an upstream 404) as
/// `Ok` values so they are not retried.
pub async fn with_backoff<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut delay = policy.initial_delay;

    for attempt in 1..=policy.retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    what,
                    attempt,
                    max_attempts = policy.retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed; backing off"
                );
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(policy.backoff_factor);
            }
        }
    }

    // Final attempt; its error is the one callers see.
    match op().await {
        Ok(value) => Ok(value),
        Err(e) => {
            error!(
                what,
                attempts = policy.retries + 1,
                error = %e,
                "all attempts failed"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn immediate(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            initial_delay: Duration::ZERO,
            backoff_factor: 2.0,
        }
    }

    #[tokio::test]
    async fn attempts_exactly_retries_plus_one_then_propagates_last_error() {
        let calls = AtomicU32::new(0);
        let result: anyhow::Result<()> = with_backoff(immediate(3), "always-fails", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(anyhow!("failure #{n}")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let err = result.expect_err("must propagate after exhausting attempts");
        assert_eq!(err.to_string(), "failure #4");
    }

    #[tokio::test]
    async fn returns_immediately_on_success() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(immediate(3), "first-try", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(immediate(3), "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(anyhow!("transient"))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_means_a_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: anyhow::Result<()> = with_backoff(immediate(0), "one-shot", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow!("nope")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
