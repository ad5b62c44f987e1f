use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{FetchResult, RemoteFetchError, CLIENT_ERROR_MARKER};

const BASE_DELAY_MS: u64 = 1_000;
const MAX_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Give up immediately on failures whose message marks a 4xx.
    pub skip_client_errors: bool,
}

impl RetryPolicy {
    pub const fn never() -> Self {
        Self {
            max_retries: 0,
            skip_client_errors: false,
        }
    }

    /// Retry any failure up to `max_retries` times.
    pub const fn times(max_retries: u32) -> Self {
        Self {
            max_retries,
            skip_client_errors: false,
        }
    }

    /// Retry up to `max_retries` times unless the server rejected the request.
    pub const fn skip_client_errors(max_retries: u32) -> Self {
        Self {
            max_retries,
            skip_client_errors: true,
        }
    }

    /// `failure_count` is the number of failures before this one.
    pub fn should_retry(&self, failure_count: u32, error: &RemoteFetchError) -> bool {
        if self.skip_client_errors && error.to_string().contains(CLIENT_ERROR_MARKER) {
            return false;
        }
        failure_count < self.max_retries
    }
}

/// `min(1000 * 2^attempt, 30000)` milliseconds.
pub fn retry_delay(attempt: u32) -> Duration {
    let ms = 1u64
        .checked_shl(attempt)
        .and_then(|factor| BASE_DELAY_MS.checked_mul(factor))
        .unwrap_or(MAX_DELAY_MS)
        .min(MAX_DELAY_MS);
    Duration::from_millis(ms)
}

/// Run `op` until it succeeds or `policy` gives up.
///
/// Retries only continue while `keep_retrying` holds `true`. Flipping it to
/// `false` (or dropping the sender) stops the backoff; the attempt already
/// running completes and its error is returned. Flipping it back before that
/// attempt fails keeps the full policy.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    mut keep_retrying: watch::Receiver<bool>,
    mut op: F,
) -> FetchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let mut failures = 0;
    loop {
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !policy.should_retry(failures, &error) {
            tracing::debug!(error = %error, attempts = %(failures + 1), "Giving up");
            return Err(error);
        }

        let delay = retry_delay(failures);
        tracing::warn!(
            error = %error,
            attempt = %(failures + 1),
            delay_ms = %delay.as_millis(),
            "Fetch failed, retrying"
        );

        tokio::select! {
            biased;
            _ = retries_stopped(&mut keep_retrying) => {
                tracing::debug!(error = %error, "Retry cancelled, no observers left");
                return Err(error);
            }
            _ = tokio::time::sleep(delay) => {}
        }
        failures += 1;
    }
}

async fn retries_stopped(keep_retrying: &mut watch::Receiver<bool>) {
    while *keep_retrying.borrow_and_update() {
        if keep_retrying.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn retrying() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(true)
    }

    fn not_found() -> RemoteFetchError {
        RemoteFetchError::Http {
            status: 404,
            message: "Not Found".into(),
        }
    }

    fn network() -> RemoteFetchError {
        RemoteFetchError::Network("connection reset".into())
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(retry_delay(0), Duration::from_millis(1_000));
        assert_eq!(retry_delay(1), Duration::from_millis(2_000));
        assert_eq!(retry_delay(2), Duration::from_millis(4_000));
        assert_eq!(retry_delay(4), Duration::from_millis(16_000));
        assert_eq!(retry_delay(5), Duration::from_millis(30_000));
        assert_eq!(retry_delay(63), Duration::from_millis(30_000));
        assert_eq!(retry_delay(200), Duration::from_millis(30_000));
    }

    #[test]
    fn test_client_error_marker_short_circuits() {
        let policy = RetryPolicy::skip_client_errors(3);
        assert!(!policy.should_retry(0, &not_found()));
        assert!(policy.should_retry(0, &network()));
        assert!(policy.should_retry(2, &network()));
        assert!(!policy.should_retry(3, &network()));

        let server = RemoteFetchError::Http {
            status: 502,
            message: "Bad Gateway".into(),
        };
        assert!(policy.should_retry(0, &server));
    }

    #[test]
    fn test_times_ignores_status() {
        let policy = RetryPolicy::times(1);
        assert!(policy.should_retry(0, &not_found()));
        assert!(!policy.should_retry(1, &not_found()));
        assert!(!RetryPolicy::never().should_retry(0, &network()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_gets_one_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let (_tx, rx) = retrying();
        let result: FetchResult<()> = with_retry(RetryPolicy::skip_client_errors(3), rx, || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(not_found()) }
        })
        .await;

        assert_eq!(result, Err(not_found()));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_retries_with_backoff() {
        let start = Instant::now();
        let attempt_times = Arc::new(std::sync::Mutex::new(Vec::new()));
        let times = attempt_times.clone();
        let (_tx, rx) = retrying();
        let result: FetchResult<()> = with_retry(RetryPolicy::skip_client_errors(3), rx, || {
            times.lock().unwrap().push(start.elapsed().as_millis());
            async { Err(network()) }
        })
        .await;

        assert_eq!(result, Err(network()));
        let times = attempt_times.lock().unwrap();
        assert_eq!(
            *times,
            vec![0, 1_000, 3_000, 7_000]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let (_tx, rx) = retrying();
        let result = with_retry(RetryPolicy::times(1), rx, || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(network())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_retrying() {
        let (tx, rx) = retrying();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result: FetchResult<()> = with_retry(RetryPolicy::skip_client_errors(3), rx, || {
            counter.fetch_add(1, Ordering::SeqCst);
            tx.send_replace(false);
            async { Err(network()) }
        })
        .await;

        assert_eq!(result, Err(network()));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_retrying() {
        let (tx, rx) = retrying();
        drop(tx);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result: FetchResult<()> = with_retry(RetryPolicy::skip_client_errors(3), rx, || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(network()) }
        })
        .await;

        assert_eq!(result, Err(network()));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearmed_before_failure_keeps_full_policy() {
        let (tx, rx) = retrying();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result: FetchResult<()> = with_retry(RetryPolicy::skip_client_errors(3), rx, || {
            counter.fetch_add(1, Ordering::SeqCst);
            // Unmounted and mounted again while the attempt runs.
            tx.send_replace(false);
            tx.send_replace(true);
            async { Err(network()) }
        })
        .await;

        assert_eq!(result, Err(network()));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }
}
