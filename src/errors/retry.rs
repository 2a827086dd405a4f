use std::future::Future;
use std::time::Duration;

use super::types::StingrayError;
use tracing::warn;

/// Retry policy for read calls against the scan service.
///
/// Reads are retried with a fixed delay; the service is a slow batch system
/// and does not benefit from backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// A policy that never retries, used by tests and for write calls.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Execute a read operation with fixed-delay retries.
///
/// A result rejected by `accept` (typically a non-2xx response) is retried
/// until the policy is exhausted, after which the last result is returned
/// as-is so the caller can report it. Errors are retried only when they
/// classify as retryable; the last error is returned on exhaustion.
pub async fn with_read_retry<T, F, Fut, A>(
    operation_name: &str,
    policy: &RetryPolicy,
    accept: A,
    mut factory: F,
) -> Result<T, StingrayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StingrayError>>,
    A: Fn(&T) -> bool,
{
    let max_attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = factory().await;
        let last_attempt = attempt >= max_attempts;

        match result {
            Ok(value) if accept(&value) => return Ok(value),
            Ok(value) => {
                if last_attempt {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        "Read attempts exhausted, returning last response"
                    );
                    return Ok(value);
                }
                warn!(
                    operation = operation_name,
                    attempt,
                    max = max_attempts,
                    delay_secs = policy.delay.as_secs(),
                    "Unsuccessful response, trying again"
                );
            }
            Err(e) => {
                let classification = e.classify();
                if !classification.retryable || last_attempt {
                    if !classification.retryable {
                        warn!(
                            operation = operation_name,
                            error_type = classification.error_type,
                            "Non-retryable error, failing immediately"
                        );
                    } else {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            "Max retries exhausted"
                        );
                    }
                    return Err(e);
                }
                warn!(
                    operation = operation_name,
                    attempt,
                    max = max_attempts,
                    error_type = classification.error_type,
                    error = %e,
                    "Retrying after error"
                );
            }
        }

        tokio::time::sleep(policy.delay).await;
    }
}
