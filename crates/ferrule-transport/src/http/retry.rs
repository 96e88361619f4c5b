//! Retry policy for HTTP transport
//!
//! Wraps `ExponentialBackoff` from `ferrule-core` with HTTP-specific
//! defaults and a classification of which transport errors are worth
//! retrying.

use crate::error::TransportError;
use ferrule_core::retry::{BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// HTTP-specific retry policy.
///
/// # Default Configuration
///
/// - `max_retries`: 3
/// - `initial_delay`: 500ms
/// - `max_delay`: 60s
/// - `multiplier`: 2.0
/// - `jitter`: 0.1
///
/// Inter-resource calls default to [`RetryPolicy::none`] so a call never
/// outlives its timeout by more than one attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    inner: ExponentialBackoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicyBuilder::default().build()
    }
}

impl RetryPolicy {
    /// Create a new builder starting from the HTTP defaults.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::builder().max_retries(0).build()
    }

    /// Check if a transport error should be retried.
    ///
    /// Only timeouts and connection failures are retried; HTTP statuses are
    /// handled by the caller and everything else would fail again.
    pub fn is_retryable(error: &TransportError) -> bool {
        match error {
            TransportError::Timeout => true,
            TransportError::Connection(_) => true,
            TransportError::Http(_) => false,
            TransportError::Serialization(_) => false,
            TransportError::Io(_) => false,
            TransportError::Process(_) => false,
            TransportError::Other(_) => false,
        }
    }

    /// Delay before retry number `attempt`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.inner.next_delay(attempt).unwrap_or(Duration::ZERO)
    }
}

#[async_trait::async_trait]
impl BackoffStrategy for RetryPolicy {
    async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<T, E>> + Send,
        T: Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.inner.execute(operation).await
    }

    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        self.inner.next_delay(attempt)
    }

    fn max_retries(&self) -> u32 {
        self.inner.max_retries()
    }
}

/// Builder for HTTP retry policies.
pub struct RetryPolicyBuilder {
    inner: ExponentialBackoffBuilder,
}

impl RetryPolicyBuilder {
    /// Set the maximum number of retry attempts.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.inner = self.inner.max_retries(max_retries);
        self
    }

    /// Set the initial delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.inner = self.inner.initial_delay(delay);
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.inner = self.inner.max_delay(delay);
        self
    }

    /// Set the jitter factor (0.0 to 1.0).
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.inner = self.inner.jitter(jitter);
        self
    }

    /// Build the retry policy.
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            inner: self.inner.build(),
        }
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            inner: ExponentialBackoff::builder()
                .max_retries(3)
                .initial_delay(Duration::from_millis(500))
                .max_delay(Duration::from_secs(60))
                .multiplier(2.0)
                .jitter(0.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TransportError::Timeout, true)]
    #[case(TransportError::Connection("refused".into()), true)]
    #[case(TransportError::Http("500".into()), false)]
    #[case(TransportError::Serialization("bad json".into()), false)]
    #[case(TransportError::Io(std::io::Error::other("io")), false)]
    fn retry_classification(#[case] error: TransportError, #[case] retryable: bool) {
        assert_eq!(RetryPolicy::is_retryable(&error), retryable);
    }

    #[test]
    fn default_first_delay_is_about_half_a_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);

        let first = policy.calculate_delay(0).as_millis();
        assert!((450..=550).contains(&first));
    }

    #[test]
    fn none_never_retries() {
        assert_eq!(RetryPolicy::none().max_retries(), 0);
    }
}
