//! Retry logic with exponential backoff
//!
//! A generic combinator that wraps an arbitrary fallible async operation
//! with bounded retry and un-jittered exponential delay. Each pipeline
//! stage wraps its own network call with its own diagnostic label.
//!
//! # Example
//!
//! ```no_run
//! use catalog_media::retry::{retry_with_backoff, IsRetryable, RetryPolicy};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let policy = RetryPolicy::default();
//! retry_with_backoff(&policy, "my-operation", || async {
//!     Ok::<_, MyError>(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, RegisterError, SourceError, UploadError};
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, rate limits, 5xx)
/// should return `true`. Acknowledged rejections and integrity violations
/// should return `false` — retrying them cannot help.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Transport-level problems are worth another attempt
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            // Rate limits and server-side failures are transient by definition
            Error::Source(e) => matches!(
                e,
                SourceError::RateLimited | SourceError::Unavailable { .. }
            ),
            Error::Upload(e) => matches!(e, UploadError::Unavailable { .. }),
            Error::Register(e) => matches!(e, RegisterError::Unavailable { .. }),
            // Integrity violations are terminal for the item
            Error::Pipeline(_) => false,
            // Setup-level and local failures are permanent
            Error::Config { .. } => false,
            Error::Dataset { .. } => false,
            Error::Manifest(_) => false,
            Error::Io(_) => false,
            Error::Serialization(_) => false,
        }
    }
}

/// Options for [`retry_with_backoff`]
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (must be >= 1)
    pub attempts: u32,
    /// Delay before the second attempt; later delays grow geometrically
    pub initial_delay: Duration,
    /// Backoff multiplier (must be > 1)
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_secs(1),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the k-th failed attempt (1-based):
    /// `initial_delay * factor^(k-1)`.
    fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        Duration::from_secs_f64(self.initial_delay.as_secs_f64() * self.factor.powi(exp as i32))
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Runs `operation` up to `policy.attempts` times. The first attempt runs
/// immediately; after a retryable failure of attempt k the task sleeps
/// `initial_delay * factor^(k-1)` before attempt k+1. Non-retryable errors
/// surface immediately, and the error from the final attempt is returned
/// as-is once the budget is exhausted.
///
/// The combinator only suspends its own calling task during waits; it
/// imposes no parallelism of its own.
///
/// # Arguments
///
/// * `policy` - Attempt bound, initial delay, and backoff factor
/// * `label` - Diagnostic label naming the operation in log output
/// * `operation` - Async closure returning `Result<T, E>` where `E: IsRetryable`
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    // attempts of 0 would never run the operation; treat it as 1
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(label, attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    label,
                    error = %e,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis(),
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        label,
                        error = %e,
                        attempts,
                        "operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        label,
                        error = %e,
                        "operation failed with non-retryable error"
                    );
                }
                return Err(e);
            }
        }
    }

    unreachable!("retry loop always returns from its final attempt")
}
