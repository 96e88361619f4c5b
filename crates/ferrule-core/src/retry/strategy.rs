//! The retry strategy contract.

use async_trait::async_trait;
use std::error::Error;
use std::future::Future;
use std::time::Duration;

/// A strategy for retrying failed operations with backoff.
///
/// Implementations decide when to retry, how long to wait between attempts
/// and when to give up. Transports use it for transient network failures;
/// the discovery layer uses the same strategy when it waits for a shared
/// registry process to answer.
///
/// # Examples
///
/// ```rust
/// use ferrule_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backoff = ExponentialBackoff::builder()
///     .max_retries(3)
///     .initial_delay(Duration::from_millis(10))
///     .build();
///
/// let attempts = Arc::new(AtomicU32::new(0));
/// let result = backoff.execute(|| {
///     let attempts = Arc::clone(&attempts);
///     async move {
///         if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
///             Err(std::io::Error::other("not yet"))
///         } else {
///             Ok(42)
///         }
///     }
/// }).await?;
/// assert_eq!(result, 42);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait BackoffStrategy: Send + Sync {
    /// Execute an operation with retry logic.
    ///
    /// The operation is called until it succeeds, a non-retryable error
    /// occurs, or the maximum number of retries is exceeded. The last error
    /// is returned when the strategy gives up.
    async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Error + Send + Sync + 'static;

    /// Determine if an error is retryable.
    ///
    /// Default implementation returns `true` for all errors.
    fn should_retry(&self, error: &dyn Error, attempt: u32) -> bool {
        let _ = (error, attempt);
        true
    }

    /// Delay before retry number `attempt` (0-indexed, called after a
    /// failure). `None` means no more retries should be attempted.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Maximum number of retries after the initial attempt.
    fn max_retries(&self) -> u32;
}
