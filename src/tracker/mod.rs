//! HTTP client for the external time-tracking service.
//!
//! Every call is a GET against a per-user base URL, authenticated with a
//! static API-key header. Requests are retried with exponential backoff on
//! network failures and 5xx responses only; 4xx responses propagate
//! immediately (a bad credential does not get better by retrying).

pub mod client;
pub mod paginate;
pub mod types;

pub use client::TrackerClient;
pub use paginate::{PageCursor, PageSource};
pub use types::{RawActivity, RawProject, RawRef, RawTimesheet};

use std::time::Duration;

use thiserror::Error;

/// Header carrying the per-user API key.
pub const AUTH_HEADER: &str = "X-AUTH-API-TOKEN";

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tracker API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Invalid tracker URL '{0}': {1}")]
    InvalidUrl(String, String),
}

impl TrackerError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::Http(e) => e.is_timeout() || e.is_connect(),
            TrackerError::Api { status, .. } => *status >= 500,
            TrackerError::InvalidUrl(..) => false,
        }
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            TrackerError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Retry policy for tracker requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (3 retries = 4 total attempts).
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

/// Compute the delay before retry number `retries_done + 1`.
///
/// Honors a Retry-After hint (capped at 30s) when the server sent one,
/// otherwise exponential backoff with a little jitter so concurrent workers
/// don't thundering-herd the tracker.
fn retry_delay(retries_done: u32, policy: &RetryPolicy, retry_after: Option<u64>) -> Duration {
    if let Some(secs) = retry_after {
        return Duration::from_secs(secs.min(30));
    }

    let exp = 2u64.saturating_pow(retries_done);
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exp)
        .min(policy.max_backoff_ms);
    let jitter = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0)
        % 150;
    Duration::from_millis(base.saturating_add(jitter))
}

/// Run `op` with bounded retries for retryable failures.
///
/// The operation is re-invoked from scratch on each attempt; non-retryable
/// errors and budget exhaustion propagate the last error unchanged.
pub async fn fetch_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, TrackerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TrackerError>>,
{
    let mut retries = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retries < policy.max_retries => {
                let delay = retry_delay(retries, policy, err.retry_after_secs());
                log::warn!(
                    "tracker retry {}/{} after {} (sleep {:?})",
                    retries + 1,
                    policy.max_retries,
                    err,
                    delay
                );
                retries += 1;
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    fn server_error() -> TrackerError {
        TrackerError::Api {
            status: 503,
            message: "unavailable".to_string(),
            retry_after: None,
        }
    }

    #[test]
    fn retry_delay_honors_retry_after_with_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(
            retry_delay(0, &policy, Some(5)),
            Duration::from_secs(5)
        );
        assert_eq!(
            retry_delay(0, &policy, Some(900)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn retry_delay_backs_off_exponentially() {
        let policy = RetryPolicy::default();
        // Jitter adds at most 149ms on top of the base.
        let first = retry_delay(0, &policy, None).as_millis() as u64;
        let second = retry_delay(1, &policy, None).as_millis() as u64;
        let third = retry_delay(2, &policy, None).as_millis() as u64;
        assert!((250..400).contains(&first), "first delay was {}ms", first);
        assert!((500..650).contains(&second), "second delay was {}ms", second);
        assert!((1000..1150).contains(&third), "third delay was {}ms", third);
    }

    #[tokio::test]
    async fn exhausts_budget_then_propagates() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TrackerError> = fetch_with_retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert!(matches!(
            result,
            Err(TrackerError::Api { status: 503, .. })
        ));
        // 1 initial attempt + 3 retries, never a 5th call
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TrackerError> = fetch_with_retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(TrackerError::Api {
                    status: 401,
                    message: "bad token".to_string(),
                    retry_after: None,
                })
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(TrackerError::Api { status: 401, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_when_a_retry_succeeds() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
