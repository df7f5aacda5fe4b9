use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    /// Initial delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles the delay each time)
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Preset: a preference write plus exactly one retry.
    pub fn preference_write() -> Self {
        Self::new(2, Duration::from_millis(50)).with_max_delay(Duration::from_millis(50))
    }

    /// Preset: chat platform REST calls (3 attempts)
    /// Delays: 1s, 2s = 3s total wait time
    pub fn chat_api() -> Self {
        Self::new(3, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(2.0)
    }

    /// Delay before the given attempt (0-indexed); the first attempt never waits.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::chat_api()
    }
}

/// Execute an async operation, retrying every failure.
///
/// Returns the first success, or the last error once `max_attempts` is
/// exhausted. A `max_attempts` of 0 is treated as 1.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(config, operation_name, operation, |_| true).await
}

/// Execute an async operation, retrying only failures accepted by `should_retry`.
///
/// A rejected error is returned immediately without further attempts.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    with_retry_policy(config, operation_name, operation, |e| {
        if should_retry(e) {
            RetryPolicy::Backoff
        } else {
            RetryPolicy::Stop
        }
    })
    .await
}

/// How to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Give up and return the error.
    Stop,
    /// Wait the configured backoff delay, then try again.
    Backoff,
    /// Wait exactly this long (for example a server's `Retry-After`). A wait
    /// longer than `max_delay` gives up instead.
    After(Duration),
}

/// Execute an async operation, asking `policy` after every failure whether
/// and when to try again.
pub async fn with_retry_policy<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    policy: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> RetryPolicy,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let e = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "{}: Succeeded on attempt {}/{}",
                        operation_name,
                        attempt + 1,
                        max_attempts
                    );
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        let delay = match policy(&e) {
            RetryPolicy::Stop => {
                debug!(
                    "{}: Error is not retryable, failing immediately: {}",
                    operation_name, e
                );
                return Err(e);
            }
            RetryPolicy::Backoff => config.delay_for_attempt(attempt + 1),
            RetryPolicy::After(delay) if delay > config.max_delay => {
                warn!(
                    "{}: Asked to wait {:?}, over the {:?} limit. Last error: {}",
                    operation_name, delay, config.max_delay, e
                );
                return Err(e);
            }
            RetryPolicy::After(delay) => delay,
        };

        let remaining = max_attempts - attempt - 1;
        if remaining == 0 {
            warn!(
                "{}: All {} attempts failed. Last error: {}",
                operation_name, max_attempts, e
            );
            return Err(e);
        }

        warn!(
            "{}: Attempt {}/{} failed ({}), {} retries remaining",
            operation_name,
            attempt + 1,
            max_attempts,
            e,
            remaining
        );
        attempt += 1;

        debug!(
            "{}: Retry attempt {}/{} after {:?}",
            operation_name,
            attempt + 1,
            max_attempts,
            delay
        );
        sleep(delay).await;
    }
}
