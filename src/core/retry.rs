//! Bounded fixed-delay retry with an injectable clock.

use async_trait::async_trait;
use std::time::Duration;

/// Source of delays between attempts. Tests substitute a recorder.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Yields to the runtime for the delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Total time spent sleeping when every attempt fails.
    pub fn worst_case_wait(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }
}

/// Last error seen by [`retry`], with the number of attempts made.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub attempts: u32,
    pub error: E,
    /// `true` when the budget ran out, `false` when the error was not retryable.
    pub exhausted: bool,
}

/// Run `op` until it succeeds, returns a non-retryable error, or the budget runs out.
///
/// The sleeper is only consulted between attempts, never after the last one.
pub async fn retry<T, E, F, P>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
    is_retryable: P,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !is_retryable(&error) {
                    return Err(RetryFailure {
                        attempts: attempt,
                        error,
                        exhausted: false,
                    });
                }
                if attempt >= policy.max_attempts {
                    return Err(RetryFailure {
                        attempts: attempt,
                        error,
                        exhausted: true,
                    });
                }
                sleeper.sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
