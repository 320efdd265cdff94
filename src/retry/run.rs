// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::policy::{ErrorKind, RetryDecision, RetryPolicy};

/// Errors that know whether they are worth retrying
pub trait Retryable {
    fn kind(&self) -> ErrorKind;
}

/// Source of delays, injectable so tests can run without waiting
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `op` until it succeeds or the policy says to stop.
///
/// `what` names the operation in log output.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    what: &str,
    mut op: F,
) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => match policy.decide(attempt, e.kind()) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "{what} failed, retrying: {e}"
                    );
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
            },
        }
    }
}
