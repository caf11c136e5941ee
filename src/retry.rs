//! Retry policy with exponential backoff and jitter.

use rand::random;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::UpstreamError;

/// Result of a single transport attempt, classified once at the transport
/// boundary
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// 429, 5xx or network failure; `retry_after` is the server's hint
    RetryableFailure {
        reason: UpstreamError,
        retry_after: Option<Duration>,
    },
    /// Anything a retry cannot fix
    FatalFailure(UpstreamError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: 2.0,
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    /// Computed backoff before retry number `attempt + 1` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let jitter_factor = 1.0 + (random::<f64>() - 0.5) * 2.0 * self.jitter;
        let jittered = base * jitter_factor;
        let clamped = jittered.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(clamped)
    }

    /// Backoff actually slept: the server hint wins over the schedule
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.delay_for_attempt(attempt))
    }

    /// Run `attempt` until it succeeds, fails fatally, or the attempt budget
    /// runs out.
    ///
    /// `attempt` receives the 1-based attempt number. Attempts run
    /// sequentially; the backoff sleep ends early with a
    /// `RateLimitTimeout` when `cancel` fires.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<T, UpstreamError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AttemptOutcome<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut n = 1;

        loop {
            match attempt(n).await {
                AttemptOutcome::Success(value) => {
                    if n > 1 {
                        tracing::debug!("✅ Succeeded on attempt {}/{}", n, max_attempts);
                    }
                    return Ok(value);
                }
                AttemptOutcome::FatalFailure(reason) => {
                    return Err(reason.with_attempts(n));
                }
                AttemptOutcome::RetryableFailure { reason, retry_after } => {
                    if n >= max_attempts {
                        tracing::warn!(
                            "❌ Giving up after {} attempts: {}",
                            n,
                            reason
                        );
                        return Err(reason.with_attempts(n));
                    }

                    let delay = self.backoff(n - 1, retry_after);
                    tracing::warn!(
                        "🔁 Attempt {}/{} failed ({}), retrying in {:?}",
                        n,
                        max_attempts,
                        reason,
                        delay
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            let err = UpstreamError::rate_limit_timeout(
                                "cancelled during retry backoff",
                            );
                            return Err(err.with_status(reason.status).with_attempts(n));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    n += 1;
                }
            }
        }
    }
}
