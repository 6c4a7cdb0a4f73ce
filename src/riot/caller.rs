//! Bounded retry of Riot API calls on quota exhaustion.

use super::errors::RiotApiError;
use crate::error::SyncError;
use crate::utils::fmt_duration;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Total attempts per call, including the first.
pub const MAX_ATTEMPTS: u32 = 30;

/// Added on top of the advertised delay so we land after the window resets.
const RETRY_PADDING: Duration = Duration::from_secs(1);

/// Upper bound on an advertised `Retry-After`. Riot rate windows are at most
/// a few minutes long, so anything above this is a malformed header.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(600);

/// Suspends the calling task. Swapped for a no-op in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs an operation against the Riot API, sleeping out `429`s.
///
/// Quota exhaustion is retried after `retry_after + 1s`, up to
/// [`MAX_ATTEMPTS`] attempts in total. Every other failure is returned on
/// the attempt that produced it. The sleep only suspends the task making the
/// call; concurrent callers back off independently.
#[derive(Clone)]
pub struct RateLimitedCaller {
    sleeper: Arc<dyn Sleeper>,
    max_attempts: u32,
}

impl Default for RateLimitedCaller {
    fn default() -> Self {
        Self::new(Arc::new(TokioSleeper))
    }
}

impl RateLimitedCaller {
    pub fn new(sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            sleeper,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub async fn call<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RiotApiError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempts = attempt, "Call succeeded after backing off");
                    }
                    return Ok(value);
                }
                Err(RiotApiError::QuotaExhausted { retry_after }) => {
                    if attempt >= self.max_attempts {
                        error!(
                            label,
                            attempts = attempt,
                            "Quota never freed up, giving up"
                        );
                        return Err(SyncError::RetriesExhausted { attempts: attempt });
                    }

                    let delay = retry_after.min(MAX_RETRY_AFTER).saturating_add(RETRY_PADDING);
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay = fmt_duration(delay),
                        "Rate limited, backing off"
                    );
                    self.sleeper.sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
