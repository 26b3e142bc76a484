//! Bounded retry around fallible remote operations.
//!
//! Remote-shell interactions over flaky links routinely fail on the first
//! attempt (login banners mid-flush, half-filled buffers). Masking those at
//! one wrapper point keeps retry logic out of every protocol step.

use std::time::Duration;

use futures_util::future::BoxFuture;
use log::warn;
use tokio::time::sleep;

use crate::error::Result;

/// A fixed attempt count and inter-attempt delay.
///
/// [`run`](Self::run) invokes the operation until it succeeds or the attempt
/// budget is spent, then returns the *last* error. It never escalates on its
/// own; the caller decides whether the exhausted error is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one is always made).
    pub attempts: u32,

    /// Sleep between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given attempt count and delay.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Policy for establishing an SSH session.
    pub fn connect() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    /// Policy for the version/uptime command, whose reply often arrives
    /// truncated on the first read.
    pub fn uptime_check() -> Self {
        Self::new(5, Duration::from_millis(500))
    }

    /// Policy for the interface status enumeration command.
    pub fn port_enumeration() -> Self {
        Self::new(3, Duration::from_millis(300))
    }

    /// Policy for the per-interface inspection command.
    pub fn port_inspection() -> Self {
        Self::new(5, Duration::from_millis(300))
    }

    /// Run `op` under this policy.
    ///
    /// `ctx` is lent mutably to each attempt; `what` names the operation and
    /// its arguments for the retry trace. Each failed attempt is logged with
    /// its position in the budget before the delay is applied.
    pub async fn run<C, T, F>(&self, what: &str, ctx: &mut C, mut op: F) -> Result<T>
    where
        C: ?Sized + Send,
        F: for<'a> FnMut(&'a mut C) -> BoxFuture<'a, Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(ctx).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts => {
                    warn!("{what}: attempt {attempt}/{attempts} failed: {err}, retrying");
                    attempt += 1;
                    sleep(self.delay).await;
                }
                Err(err) => {
                    warn!("{what}: giving up after {attempts} attempt(s)");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use futures_util::FutureExt;

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0u32;
        let result = policy
            .run("op", &mut calls, |calls| {
                async move {
                    *calls += 1;
                    Ok(*calls)
                }
                .boxed()
            })
            .await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0u32;
        let result = policy
            .run("op", &mut calls, |calls| {
                async move {
                    *calls += 1;
                    if *calls < 3 {
                        Err(Error::Validation("not yet".into()))
                    } else {
                        Ok(*calls)
                    }
                }
                .boxed()
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0u32;
        let result: Result<()> = policy
            .run("op", &mut calls, |calls| {
                async move {
                    *calls += 1;
                    Err(Error::Validation(format!("failure {calls}")))
                }
                .boxed()
            })
            .await;
        assert_eq!(calls, 3);
        match result {
            Err(Error::Validation(message)) => assert_eq!(message, "failure 3"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let mut calls = 0u32;
        let _ = policy
            .run("op", &mut calls, |calls| {
                async move {
                    *calls += 1;
                    Ok(())
                }
                .boxed()
            })
            .await;
        assert_eq!(calls, 1);
    }
}
