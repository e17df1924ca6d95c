use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Bounded Retry with Backoff
// ============================================================================
//
// Retries an async operation a fixed number of times. The delay before the
// next attempt is derived from the attempt that just failed:
//
// - Linear:      attempt × base_delay           (1s, 2s, 3s, ...)
// - Exponential: base_delay × multiplier^(n-1)  (1s, 2s, 4s, ...)
//
// Both are capped at `max_delay`. Errors that report themselves as permanent
// stop the loop immediately.
//
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Backoff {
    Linear,
    Exponential { multiplier: f64 },
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay unit the backoff strategy scales
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Linear,
        }
    }
}

impl RetryConfig {
    /// Linear backoff: the n-th failed attempt waits n × `base_delay`.
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
            Backoff::Exponential { multiplier } => {
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                let secs = self.base_delay.as_secs_f64() * factor;
                Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
            }
        };
        delay.min(self.max_delay)
    }
}

/// Result of a retry operation
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded on the given attempt
    Success { value: T, attempts: u32 },
    /// Operation failed after all retries
    Failed { error: E, attempts: u32 },
    /// Operation permanently failed (should not retry)
    PermanentFailure { error: E, attempts: u32 },
}

/// Check if an error is transient (should retry) or permanent (should not retry)
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Retry with transient error checking
pub async fn retry_on_transient<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return RetryResult::Success { value, attempts: attempt };
            }
            Err(error) => {
                if !error.is_transient() {
                    tracing::error!(
                        error = %error,
                        "Permanent failure detected, not retrying"
                    );
                    return RetryResult::PermanentFailure { error, attempts: attempt };
                }

                if attempt >= max_attempts {
                    tracing::error!(
                        attempt = attempt,
                        error = %error,
                        "Operation failed after all retries"
                    );
                    return RetryResult::Failed { error, attempts: attempt };
                }

                let delay = config.delay_after(attempt);
                tracing::warn!(
                    attempt = attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying after delay"
                );

                sleep(delay).await;
            }
        }
    }
}
