//! Retry engine with exponential backoff, jitter, and cancellation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{Error, ErrorKind, Result};

/// Callback invoked before each retry with the attempt number (1-based) and
/// the error that caused it.
pub type RetryCallback = Arc<dyn Fn(u32, &Error) + Send + Sync>;

/// Configuration for retry behavior.
#[derive(Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Minimum wait time between retries.
    pub min_wait: Duration,
    /// Maximum wait time between retries.
    pub max_wait: Duration,
    /// Adds randomization to wait times to prevent thundering herd.
    pub enable_jitter: bool,
    /// HTTP status codes that trigger a retry when the envelope carries no
    /// special busy code.
    pub retryable_status_codes: Vec<u16>,
    /// Optional callback called before each retry attempt.
    pub on_retry: Option<RetryCallback>,
}

impl std::fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("min_wait", &self.min_wait)
            .field("max_wait", &self.max_wait)
            .field("enable_jitter", &self.enable_jitter)
            .field("retryable_status_codes", &self.retryable_status_codes)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "Fn"))
            .finish()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
            enable_jitter: true,
            retryable_status_codes: vec![429, 500, 502, 503, 504],
            on_retry: None,
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the minimum and maximum wait time between retries.
    pub fn with_wait_times(mut self, min: Duration, max: Duration) -> Self {
        self.min_wait = min;
        self.max_wait = max;
        self
    }

    /// Enable or disable backoff jitter.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.enable_jitter = enabled;
        self
    }

    /// Set the callback invoked before each retry.
    pub fn with_on_retry(mut self, callback: RetryCallback) -> Self {
        self.on_retry = Some(callback);
        self
    }

    /// Disable retries; the operation runs exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Decide whether an error is worth another attempt.
    ///
    /// Network and timeout errors always retry. Envelope errors retry on the
    /// FileMaker busy codes (952, 953) regardless of HTTP status, otherwise
    /// only when the status is in `retryable_status_codes`.
    pub fn should_retry(&self, err: &Error) -> bool {
        match &err.kind {
            ErrorKind::Network(_) | ErrorKind::Timeout => true,
            ErrorKind::FileMaker {
                code, http_status, ..
            } => {
                matches!(code.as_str(), "952" | "953")
                    || self.retryable_status_codes.contains(http_status)
            }
            _ => false,
        }
    }

    /// Calculate the wait time before the retry following `attempt`
    /// (0-indexed): `min(min_wait * 2^attempt, max_wait)`, plus up to 25%
    /// jitter when enabled. Jitter only ever adds to the base delay.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(attempt.min(i32::MAX as u32) as i32);
        let base = Duration::from_secs_f64(
            (self.min_wait.as_secs_f64() * exp).min(self.max_wait.as_secs_f64()),
        );

        if self.enable_jitter {
            let jitter = rand::rng().random_range(0.0..0.25) * base.as_secs_f64();
            base + Duration::from_secs_f64(jitter)
        } else {
            base
        }
    }

    /// Run `op` up to `max_retries + 1` times.
    ///
    /// Cancellation is checked before every attempt, races every in-flight
    /// attempt, and interrupts every backoff sleep; a cancellation always
    /// surfaces as `ErrorKind::Cancelled`, even when an operation error was
    /// already observed. Non-retryable errors and the final attempt's error
    /// are returned unchanged.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::new(ErrorKind::Cancelled));
            }

            let err = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::new(ErrorKind::Cancelled)),
                result = op() => match result {
                    Ok(value) => return Ok(value),
                    Err(err) => err,
                },
            };

            if !self.should_retry(&err) || attempt >= self.max_retries {
                return Err(err);
            }

            if let Some(on_retry) = &self.on_retry {
                on_retry(attempt + 1, &err);
            }

            let delay = self.backoff(attempt);
            warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "request failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::new(ErrorKind::Cancelled)),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
