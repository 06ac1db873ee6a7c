// SPDX-License-Identifier: MIT

//! Bounded retry with exponential backoff and jitter for transient store
//! errors (§4.9, §7: "Transient store error: retry up to 3x with exponential
//! backoff + jitter; propagate after exhaustion").

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{StoreError, StoreResult};

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(20);
const MAX_DELAY: Duration = Duration::from_millis(500);

/// Run `op` up to [`MAX_ATTEMPTS`] times, sleeping with exponential backoff
/// plus full jitter between attempts, but only while the error reports
/// itself as retryable. Non-retryable errors return immediately.
pub async fn with_retry<T, F, Fut>(mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt);
                tracing::warn!(attempt, ?delay, error = %err, "retrying transient store error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY.saturating_mul(1 << attempt.min(10)).min(MAX_DELAY);
    let jitter_ms = rand::thread_rng().gen_range(0..=exp.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures_within_budget() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StoreError::Transient("not yet".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn propagates_after_exhausting_attempts() {
        let attempts = AtomicU32::new(0);
        let result: StoreResult<()> = with_retry(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Transient("still failing".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn non_retryable_errors_return_immediately() {
        let attempts = AtomicU32::new(0);
        let result: StoreResult<()> = with_retry(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::NotFound("x".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
