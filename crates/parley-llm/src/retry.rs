//! Exponential backoff for backend calls.
//!
//! Only the connection phase of a request runs under the policy; once a
//! streaming body is being read nothing is retried.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{LLMError, Result};

/// Retry/backoff settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max;
        self
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay;
        for _ in 1..attempt {
            delay = delay.saturating_mul(self.multiplier);
            if delay >= self.max_delay {
                return self.max_delay;
            }
        }
        delay.min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts, or `cancel` fires.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = LLMError::Network("no attempt was made".to_string());

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(LLMError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LLMError::Cancelled),
                outcome = operation(attempt) => outcome,
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Backend request succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    if attempt < max_attempts {
                        let delay = self.delay_for(attempt);
                        warn!(
                            "Backend request attempt {}/{} failed: {}, retrying in {:?}",
                            attempt, max_attempts, e, delay
                        );
                        last_error = e;
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(LLMError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        warn!(
                            "Backend request attempt {}/{} failed: {}, giving up",
                            attempt, max_attempts, e
                        );
                        last_error = e;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(LLMError::Unavailable {
            attempts: max_attempts,
            source: Box::new(last_error),
        })
    }
}
