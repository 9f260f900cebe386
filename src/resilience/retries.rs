//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a failed operation from scratch after a fixed delay
//! - Stop immediately on errors the caller classifies as fatal
//! - Guarantee termination: at most `max_retries + 1` attempts

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Why a retried operation ultimately failed.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The operation returned an error that must not be retried.
    Fatal(E),
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
}

/// Run `operation` until it succeeds, fails fatally, or the retry budget is spent.
///
/// `operation` receives the 1-based attempt number. Each attempt is a fresh
/// call; nothing is resumed from a previous attempt.
pub async fn retry_with_fixed_delay<T, E, F, Fut, P>(
    max_retries: u32,
    delay: Duration,
    is_retryable: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut remaining = max_retries;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => return Err(RetryError::Fatal(e)),
            Err(e) if remaining == 0 => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                })
            }
            Err(e) => {
                tracing::warn!(
                    attempt = attempt,
                    remaining = remaining,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                remaining -= 1;
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_exhausts_after_n_plus_one_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let result: Result<(), _> = retry_with_fixed_delay(
            3,
            Duration::from_millis(1),
            |_: &String| true,
            |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert_eq!(last, "down");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let result: Result<(), _> = retry_with_fixed_delay(
            0,
            Duration::from_secs(60),
            |_: &String| true,
            |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn test_fatal_error_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let result: Result<(), _> = retry_with_fixed_delay(
            5,
            Duration::from_millis(1),
            |e: &String| e != "fatal",
            |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Fatal(ref e)) if e == "fatal"));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let result = retry_with_fixed_delay(
            5,
            Duration::from_millis(1),
            |_: &String| true,
            |attempt| async move {
                if attempt < 3 {
                    Err("flaky".to_string())
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert!(matches!(result, Ok(3)));
    }
}
