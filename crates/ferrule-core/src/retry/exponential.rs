//! Exponential backoff with jitter.

use super::strategy::BackoffStrategy;
use async_trait::async_trait;
use std::error::Error;
use std::future::Future;
use std::time::{Duration, Instant};

/// Exponential backoff strategy with configurable jitter.
///
/// Delays grow as `initial_delay * multiplier^attempt`, capped at
/// `max_delay`, with `±jitter` randomisation applied to the base value.
///
/// Besides retrying with a retry budget ([`BackoffStrategy::execute`]), the
/// same schedule drives [`ExponentialBackoff::poll_until`], which keeps
/// trying until a wall-clock deadline passes regardless of `max_retries`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

/// Polling gave up because its deadline passed.
#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempts in {elapsed:?}: {last_error}")]
pub struct PollTimeout<E> {
    /// Number of times the operation ran
    pub attempts: u32,
    /// Time spent polling
    pub elapsed: Duration,
    /// Error returned by the final attempt
    pub last_error: E,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Run `operation` until it succeeds or `timeout` has elapsed.
    ///
    /// Sleeps between attempts follow this backoff's delay schedule but are
    /// clipped so the total wait never overshoots the deadline. The retry
    /// budget is ignored; only the deadline bounds the loop.
    ///
    /// # Errors
    ///
    /// Returns [`PollTimeout`] carrying the last error once the deadline
    /// passes without a successful attempt.
    pub async fn poll_until<F, Fut, T, E>(
        &self,
        timeout: Duration,
        mut operation: F,
    ) -> Result<T, PollTimeout<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let elapsed = started.elapsed();
            let remaining = timeout.saturating_sub(elapsed);
            if remaining.is_zero() {
                return Err(PollTimeout {
                    attempts: attempt + 1,
                    elapsed,
                    last_error: err,
                });
            }

            let delay = self.next_delay(attempt).unwrap_or(self.initial_delay);
            tokio::time::sleep(delay.min(remaining)).await;
            attempt = attempt.saturating_add(1);
        }
    }
}

impl Default for ExponentialBackoff {
    /// Defaults: 3 retries, 100ms initial delay, 60s cap, doubling, 10% jitter.
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

#[async_trait]
impl BackoffStrategy for ExponentialBackoff {
    async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Error + Send + Sync + 'static,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) if !self.should_retry(&err, attempt) => return Err(err),
                Err(err) if attempt >= self.max_retries => return Err(err),
                Err(_) => {
                    if let Some(delay) = self.next_delay(attempt) {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        let jittered = if self.jitter > 0.0 {
            let jitter_amount = base_delay * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
            base_delay + jitter_amount
        } else {
            base_delay
        };

        let capped = jittered.min(self.max_delay.as_secs_f64()).max(0.0);
        Some(Duration::from_secs_f64(capped))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Builder for configuring [`ExponentialBackoff`].
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    max_retries: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl ExponentialBackoffBuilder {
    /// Set the maximum number of retry attempts. Default: 3
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the initial delay before the first retry. Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the maximum delay between retries. Default: 60s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier. Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Set the jitter factor, clamped to `0.0..=1.0`. Default: 0.1
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Build the `ExponentialBackoff`, using defaults for unset parameters.
    pub fn build(self) -> ExponentialBackoff {
        let defaults = ExponentialBackoff::default();
        ExponentialBackoff {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_delay: self.initial_delay.unwrap_or(defaults.initial_delay),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
            jitter: self.jitter.unwrap_or(defaults.jitter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fixed(initial_ms: u64, max_ms: u64) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .max_retries(5)
            .initial_delay(Duration::from_millis(initial_ms))
            .max_delay(Duration::from_millis(max_ms))
            .jitter(0.0)
            .build()
    }

    #[test]
    fn test_exponential_delay_calculation() {
        let backoff = fixed(100, 10_000);

        assert_eq!(backoff.next_delay(0), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay(3), Some(Duration::from_millis(800)));
    }

    #[test]
    fn test_max_delay_cap() {
        let backoff = fixed(1_000, 5_000);
        for attempt in 5..10 {
            assert!(backoff.next_delay(attempt).unwrap() <= Duration::from_secs(5));
        }
    }

    #[tokio::test]
    async fn test_retry_success_on_third_attempt() {
        let backoff = fixed(1, 10);
        let attempts = Arc::new(AtomicU32::new(0));

        let result = backoff
            .execute(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(std::io::Error::other("retry me"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_max_retries_exceeded() {
        let backoff = ExponentialBackoff::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(1))
            .jitter(0.0)
            .build();
        let attempts = Arc::new(AtomicU32::new(0));

        let result = backoff
            .execute(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(std::io::Error::other("always fail"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_jitter_clamped() {
        let backoff = ExponentialBackoff::builder().jitter(2.0).build();
        assert_eq!(backoff.jitter, 1.0);

        let backoff = ExponentialBackoff::builder().jitter(-0.5).build();
        assert_eq!(backoff.jitter, 0.0);
    }

    #[tokio::test]
    async fn test_poll_until_succeeds_before_deadline() {
        let backoff = fixed(5, 20);
        let mut calls = 0u32;

        let result = backoff
            .poll_until(Duration::from_secs(2), || {
                calls += 1;
                let current = calls;
                async move {
                    if current < 4 {
                        Err("not up yet")
                    } else {
                        Ok(current)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_poll_until_ignores_retry_budget() {
        // max_retries is 0 but polling keeps going until the deadline
        let backoff = ExponentialBackoff::builder()
            .max_retries(0)
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(2))
            .jitter(0.0)
            .build();
        let mut calls = 0u32;

        let result = backoff
            .poll_until(Duration::from_secs(2), || {
                calls += 1;
                let current = calls;
                async move { if current < 10 { Err(current) } else { Ok(()) } }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls, 10);
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let backoff = fixed(10, 10);
        let started = Instant::now();

        let result = backoff
            .poll_until(Duration::from_millis(60), || async { Err::<(), _>("down") })
            .await;

        let timeout = result.unwrap_err();
        assert_eq!(timeout.last_error, "down");
        assert!(timeout.attempts >= 2);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
