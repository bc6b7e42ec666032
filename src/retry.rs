//! Bounded retry with a fixed pause between attempts.
//!
//! The remote parser and both note generators share the same policy: try up
//! to `max_attempts` times, sleep `delay` between attempts, and stop early
//! when the caller's classifier says an error is not worth retrying.
//!
//! The pause is fixed, not exponential: the services publish per-minute
//! quotas and the default 30 s outlasts half a quota window.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How many times to try a remote call and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Pause between two consecutive attempts. No pause follows the last one.
    pub delay: Duration,
}

/// The operation gave up: either the budget ran out or a fatal error was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    /// Calls actually made.
    pub attempts: u32,
    /// Error returned by the final call.
    pub last_error: E,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds, returns an error `is_retryable` rejects,
    /// or `max_attempts` calls have been made.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, C>(
        &self,
        what: &str,
        mut op: F,
        is_retryable: C,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !is_retryable(&e) {
                        warn!("{what}: attempt {attempt}/{max} failed, not retrying: {e}");
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }
                    if attempt >= max {
                        warn!("{what}: attempt {attempt}/{max} failed, giving up: {e}");
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }
                    warn!(
                        "{what}: attempt {attempt}/{max} failed, retrying in {}s: {e}",
                        self.delay.as_secs_f32()
                    );
                    sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
