//! Bounded retries with exponential backoff and per-attempt timeouts.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::duration_ms;
use crate::fetch_error::{FetchError, FetchErrorKind};
use crate::source_policy::SourcePolicy;
use crate::EnergySource;

/// Upper bound applied to provider Retry-After hints.
pub const DEFAULT_RETRY_AFTER_CAP: Duration = Duration::from_secs(30);

/// Exponential backoff schedule.
///
/// The wait after failed attempt `n` (1-based) is `base * factor^(n-1)`,
/// capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Backoff {
    pub fn delay_after(self, failed_attempt: u32) -> Duration {
        match self {
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = failed_attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let seconds = base.as_secs_f64() * factor.powi(exponent);
                let capped_seconds = if seconds.is_finite() {
                    seconds.min(max.as_secs_f64())
                } else {
                    max.as_secs_f64()
                };

                let mut delay = Duration::from_secs_f64(capped_seconds.max(0.0));

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Context handed to each attempt of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Hard limit the engine enforces on this attempt.
    pub timeout: Duration,
}

/// Runs operations under a [`SourcePolicy`].
#[derive(Debug, Clone)]
pub struct RetryEngine {
    retry_after_cap: Duration,
}

impl Default for RetryEngine {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_AFTER_CAP)
    }
}

impl RetryEngine {
    pub fn new(retry_after_cap: Duration) -> Self {
        Self { retry_after_cap }
    }

    /// Wait before the next attempt after `failed_attempt` failed with `error`.
    ///
    /// Rate-limit hints stretch the wait to `max(backoff, hint)`, clamped to
    /// the Retry-After cap.
    pub fn delay_for(&self, policy: &SourcePolicy, failed_attempt: u32, error: &FetchError) -> Duration {
        let backoff = policy.backoff().delay_after(failed_attempt);
        match (error.kind(), error.retry_after()) {
            (FetchErrorKind::RateLimited, Some(hint)) => {
                backoff.max(hint.min(self.retry_after_cap))
            }
            _ => backoff,
        }
    }

    /// Attempts `operation` up to `policy.max_retries + 1` times.
    ///
    /// Each attempt is bounded by `policy.timeout`; an attempt that overruns
    /// is dropped, cancelling whatever it had in flight, and counts as a
    /// retryable timeout. Non-retryable failures return immediately. The
    /// returned error carries the last cause and the number of attempts made.
    pub async fn execute<T, F, Fut>(
        &self,
        source: EnergySource,
        policy: &SourcePolicy,
        operation: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        self.execute_paced(source, policy, || std::future::ready(()), operation)
            .await
    }

    /// Like [`execute`](Self::execute), but awaits `pace` before every attempt.
    ///
    /// Time spent in `pace` is not charged to the attempt's timeout.
    pub async fn execute_paced<T, P, PaceFut, F, Fut>(
        &self,
        source: EnergySource,
        policy: &SourcePolicy,
        mut pace: P,
        mut operation: F,
    ) -> Result<T, FetchError>
    where
        P: FnMut() -> PaceFut,
        PaceFut: Future<Output = ()>,
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let total_attempts = policy.total_attempts();
        let mut number = 1;

        loop {
            let attempt = Attempt {
                number,
                timeout: policy.timeout,
            };
            pace().await;
            let outcome = match tokio::time::timeout(policy.timeout, operation(attempt)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::timeout(format!(
                    "attempt exceeded {} ms",
                    duration_ms::as_millis(policy.timeout)
                ))),
            };

            let error = match outcome {
                Ok(value) => {
                    if number > 1 {
                        debug!(
                            source = %source,
                            action = "retry",
                            outcome = "recovered",
                            attempt = number,
                            "attempt succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.retryable() {
                warn!(
                    source = %source,
                    action = "retry",
                    outcome = "aborted",
                    attempt = number,
                    error = %error,
                    "non-retryable failure; giving up"
                );
                return Err(error.with_attempts(number));
            }

            if number >= total_attempts {
                warn!(
                    source = %source,
                    action = "retry",
                    outcome = "exhausted",
                    attempt = number,
                    error = %error,
                    "retries exhausted"
                );
                return Err(error.with_attempts(number));
            }

            let delay = self.delay_for(policy, number, &error);
            warn!(
                source = %source,
                action = "retry",
                outcome = "scheduled",
                attempt = number,
                delay_ms = duration_ms::as_millis(delay),
                error = %error,
                "retryable failure; backing off"
            );
            tokio::time::sleep(delay).await;
            number += 1;
        }
    }
}
