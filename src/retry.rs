//! Bounded retry policy with an injectable sleep.
//!
//! Every error is treated as transient. The policy never propagates the
//! operation's error; callers inspect the returned [`RetryOutcome`].

use crate::config::RetryConfig;
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Delay schedule between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    /// Same pause after every failure.
    Fixed(Duration),
    /// `base * 2^(failures-1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the `failures`-th consecutive failure (1-based).
    pub fn delay(&self, failures: u32) -> Duration {
        match self {
            Backoff::Fixed(d) => *d,
            Backoff::Exponential { base, max } => {
                let shift = failures.saturating_sub(1).min(31);
                base.saturating_mul(1u32 << shift).min(*max)
            }
        }
    }
}

/// Something that can pause the current task.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How a retried operation ended.
#[derive(Debug)]
pub enum RetryOutcome<E> {
    /// The operation succeeded on attempt number `attempts`.
    Succeeded { attempts: u32 },
    /// Every attempt failed.
    Exhausted { attempts: u32, last_error: E },
}

impl<E> RetryOutcome<E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }

    /// Number of times the operation was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Max-attempts plus backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations allowed, including the first. Treated as at least 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(10, Duration::from_secs(10))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::fixed(config.max_attempts, Duration::from_secs(config.delay_secs))
    }
}

impl RetryPolicy {
    /// Fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// Logs one warning per failed attempt and a single error on exhaustion.
    /// No sleep follows the final failed attempt.
    pub async fn run<T, E, F, Fut>(&self, sleeper: &dyn Sleeper, mut op: F) -> RetryOutcome<E>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(_) => return RetryOutcome::Succeeded { attempts: attempt },
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Insertion failed, retrying ({}/{})",
                        attempt,
                        max_attempts
                    );

                    if attempt >= max_attempts {
                        error!(
                            attempts = attempt,
                            "Insertion failed after exceeding the maximum number of retries"
                        );
                        return RetryOutcome::Exhausted {
                            attempts: attempt,
                            last_error: e,
                        };
                    }

                    sleeper.sleep(self.backoff.delay(attempt)).await;
                }
            }
        }
    }
}
