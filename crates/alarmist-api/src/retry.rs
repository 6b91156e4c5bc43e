// Bounded, sequential retry of async operations.
//
// An operation is a closure producing a fresh future per attempt. Attempts
// never overlap: the next one starts only after the previous failure and
// the configured delay. Dropping the returned future at any point (including
// mid-delay) stops the sequence; no attempt is started afterwards.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Cancelled;

/// How many times to re-run a failed operation and how long to wait between.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub retries: u32,
    /// Pause before each additional attempt. Zero skips the timer.
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// A policy that runs the operation exactly once.
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Retry on every error.
    pub async fn run<T, E, F, Fut>(self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        retry(self, |_, _| true, operation).await
    }
}

/// Run `operation`, retrying while `should_retry(error, attempt)` allows it.
///
/// `attempt` is 1 for the first failure and increments per failure. The
/// predicate is not consulted once the retry budget is spent; the last
/// error is returned as-is.
pub async fn retry<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E, u32) -> bool,
{
    let mut remaining = policy.retries;
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt = attempt.saturating_add(1);
                if remaining == 0 || !should_retry(&err, attempt) {
                    return Err(err);
                }
                remaining -= 1;
                debug!(attempt, remaining, "operation failed, retrying");
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
}

/// [`retry`], abandoned as soon as `token` is cancelled.
///
/// Cancellation wins over a ready result; the in-flight attempt (or delay)
/// is dropped and [`Cancelled`] is converted into the caller's error type.
pub async fn retry_until_cancelled<T, E, F, Fut, P>(
    token: &CancellationToken,
    policy: RetryPolicy,
    should_retry: P,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E, u32) -> bool,
    E: From<Cancelled>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Cancelled.into()),
        result = retry(policy, should_retry, operation) => result,
    }
}
