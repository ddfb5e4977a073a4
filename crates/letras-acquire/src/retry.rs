//! Bounded exponential-backoff retries with cancellation.
//!
//! Every remote fetch and every output write goes through [`RetryExecutor`].
//! Waits between attempts are delegated to a [`Sleeper`] so tests can run the
//! full retry schedule without real delays.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use letras_model::FetchError;
use tokio_util::sync::CancellationToken;

/// How many times to retry and how long to wait before the first retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one. `0` means a single attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

/// Wait before retry number `retry` (1-based): `initial * 2^(retry - 1)`.
///
/// `retry == 0` is the first attempt and never waits.
pub fn backoff_delay(retry: u32, initial: Duration) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }
    let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
    initial.saturating_mul(factor)
}

/// Something that can wait for a duration.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>, cancel: CancellationToken) -> Self {
        Self {
            policy,
            sleeper,
            cancel,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `operation` until it succeeds, retries are exhausted, or the run
    /// is cancelled.
    ///
    /// Both the attempt and the backoff wait race the cancellation token, so
    /// a hung request or a long wait is abandoned as soon as the run is
    /// cancelled. A `Cancelled` error is returned as-is, never wrapped.
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max = self.policy.max_retries;
        let mut last = None;

        for retry in 0..=max {
            if retry > 0 {
                let delay = backoff_delay(retry, self.policy.initial_backoff);
                tracing::debug!(
                    operation = name,
                    attempt = retry,
                    total = max,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying"
                );
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = self.sleeper.sleep(delay) => {}
                }
            }

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
                outcome = operation() => outcome,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(err) => {
                    tracing::debug!(
                        operation = name,
                        attempt = retry + 1,
                        total = max + 1,
                        error = %err,
                        "Attempt failed"
                    );
                    last = Some(err);
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            retries: max,
            last: Box::new(last.unwrap_or(FetchError::Cancelled)),
        })
    }
}
