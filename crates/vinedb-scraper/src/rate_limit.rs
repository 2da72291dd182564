//! Retry with linear backoff for transient fetch failures.
//!
//! Timeouts, network errors, 429s, and 5xx responses are retried. Everything
//! else, `NotFound` in particular, is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Executes `operation`, retrying transient errors up to `max_retries`
/// additional times.
///
/// The wait before retry `n` (1-based) is `n * backoff_ms` milliseconds:
///
/// | Attempt | Sleep before it |
/// |---------|-----------------|
/// | 1 (initial) | none |
/// | 2 (first retry) | 1 × base |
/// | 3 (second retry) | 2 × base |
///
/// When the budget runs out the last error is wrapped in
/// [`FetchError::ExhaustedRetries`]. With `max_retries = 0` the transient
/// error is returned as is.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    url: &str,
    max_retries: u32,
    backoff_ms: u64,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() {
            return Err(err);
        }
        if attempt >= max_retries {
            if max_retries == 0 {
                return Err(err);
            }
            return Err(FetchError::ExhaustedRetries {
                url: url.to_owned(),
                attempts: attempt + 1,
                last: Box::new(err),
            });
        }

        attempt += 1;
        let delay_ms = backoff_ms.saturating_mul(u64::from(attempt));
        tracing::warn!(
            url,
            attempt,
            max_retries,
            delay_ms,
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const URL: &str = "https://wines.example.com/?wine=opus-one";

    fn timeout() -> FetchError {
        FetchError::Timeout {
            url: URL.to_owned(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, FetchError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_timeout_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(timeout())
                } else {
                    Ok::<u32, FetchError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wraps_last_error_after_exhausting_retries() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(timeout())
            }
        })
        .await;
        // max_retries=2 → 3 total attempts
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        match result {
            Err(FetchError::ExhaustedRetries { attempts, last, .. }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Timeout { .. }));
            }
            other => panic!("expected ExhaustedRetries, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_budget_returns_transient_error_unwrapped() {
        let result = retry_with_backoff(URL, 0, 0, || async { Err::<u32, FetchError>(timeout()) }).await;
        assert!(matches!(result, Err(FetchError::Timeout { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(FetchError::NotFound {
                    url: URL.to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(FetchError::NotFound { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(FetchError::UnexpectedStatus {
                    status: 403,
                    url: URL.to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(FetchError::UnexpectedStatus { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(URL, 1, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(FetchError::UnexpectedStatus {
                        status: 503,
                        url: URL.to_owned(),
                    })
                } else {
                    Ok::<u32, FetchError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }
}
