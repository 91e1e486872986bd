//! Retry utilities: exponential backoff with jitter, and conflict retry
//!
//! Two policies are used against the API server:
//!
//! - [`retry_transient`] for reads that may fail transiently (secret reads).
//!   Built on [`retry_with_backoff`]'s loop, capped by attempt count.
//! - [`retry_on_conflict`] for read-modify-write updates guarded by
//!   `resourceVersion`. Only HTTP 409 is retried; every other error returns
//!   immediately.
//!
//! # Example
//!
//! ```ignore
//! use rhmi_alerts::retry::retry_on_conflict;
//!
//! retry_on_conflict("scale syndesis-ui", || async {
//!     let mut dc = api.get("syndesis-ui").await?;
//!     set_replicas(&mut dc, 0);
//!     api.replace("syndesis-ui", &PostParams::default(), &dc).await?;
//!     Ok(())
//! })
//! .await?;
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, warn};

use crate::Error;

/// Configuration for operations that may fail transiently.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Jitter as a fraction of the delay (0.5 = 0.5x to 1.5x)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: 0.5,
        }
    }
}

impl RetryConfig {
    /// Create a config with a maximum number of attempts
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    /// The Kubernetes client default for optimistic-concurrency retries:
    /// 5 attempts, 10ms apart, 10% jitter, no growth.
    pub fn conflict() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 1.0,
            jitter: 0.1,
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let factor = rand::thread_rng().gen_range((1.0 - self.jitter)..(1.0 + self.jitter));
        Duration::from_secs_f64(delay.as_secs_f64() * factor)
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::from_secs_f64(
            (delay.as_secs_f64() * self.backoff_multiplier).min(self.max_delay.as_secs_f64()),
        )
    }
}

/// Execute an async operation with exponential backoff and jitter.
///
/// Retries every error until success or until `max_attempts` is reached,
/// in which case the last error is returned.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_if(config, operation_name, |_: &E| true, operation).await
}

/// Retry a read-modify-write operation while it fails with HTTP 409 Conflict.
///
/// Uses [`RetryConfig::conflict`]. Non-conflict errors are returned on the
/// first occurrence; exhausting the attempts returns the last conflict.
pub async fn retry_on_conflict<F, Fut, T>(operation_name: &str, operation: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error>>,
{
    retry_if(
        &RetryConfig::conflict(),
        operation_name,
        Error::is_conflict,
        operation,
    )
    .await
}

/// Retry while the error is [`Error::is_transient`], up to `config.max_attempts`.
///
/// Not-found and permission errors surface on the first attempt.
pub async fn retry_transient<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error>>,
{
    retry_if(config, operation_name, Error::is_transient, operation).await
}

async fn retry_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !retryable(&e) => {
                debug!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    "Operation failed with non-retryable error"
                );
                return Err(e);
            }
            Err(e) => {
                if config.max_attempts > 0 && attempt >= config.max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Operation failed after max retries"
                    );
                    return Err(e);
                }

                let jittered_delay = config.jittered(delay);

                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = jittered_delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(jittered_delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}
