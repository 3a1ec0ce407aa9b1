//! Resilience patterns for external API calls

use std::time::Duration;
use tracing::warn;

use crate::application::errors::{ApiError, DirectoryError};

/// Classification of a directory API failure, driving the retry decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// Authorization problems (401/403). Never retried.
    Fatal,
    /// Upstream throttling (429), with the server-supplied delay if present.
    RateLimited(Option<Duration>),
    /// Network failures, timeouts and retryable server errors (5xx).
    Transient,
    /// Everything else. Never retried.
    Terminal,
}

/// Classify an error into its retry class
pub fn classify(error: &DirectoryError) -> ErrorClass {
    match error {
        DirectoryError::Network(_) | DirectoryError::Timeout { .. } => ErrorClass::Transient,
        DirectoryError::Api(ApiError::Authorization { .. }) => ErrorClass::Fatal,
        DirectoryError::Api(ApiError::RateLimited { retry_after }) => {
            ErrorClass::RateLimited(*retry_after)
        }
        DirectoryError::Api(ApiError::ServiceUnavailable) => ErrorClass::Transient,
        DirectoryError::Api(ApiError::Http { status, .. }) => match status {
            500 | 502 | 503 | 504 => ErrorClass::Transient,
            _ => ErrorClass::Terminal,
        },
        DirectoryError::Json(_) => ErrorClass::Terminal,
    }
}

/// Retry configuration for exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Initial delay between retries
    pub base_delay: Duration,
    /// Ceiling on the computed backoff delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    /// Delay before the retry following `attempt` (zero-based)
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Execute an operation, retrying transient and rate-limited failures
    /// with exponential backoff. A rate-limited failure honors the
    /// server-supplied `Retry-After` delay when one was parsed; fatal and
    /// terminal failures propagate immediately. The last error is surfaced
    /// once retries are exhausted.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, DirectoryError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, DirectoryError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let delay = match classify(&error) {
                        ErrorClass::Fatal | ErrorClass::Terminal => return Err(error),
                        ErrorClass::RateLimited(retry_after) => {
                            retry_after.unwrap_or_else(|| self.backoff_delay(attempt))
                        }
                        ErrorClass::Transient => self.backoff_delay(attempt),
                    };

                    if attempt >= self.max_retries {
                        return Err(error);
                    }

                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying directory API call"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
