//! Error taxonomy of the sync pipeline.

use crate::riot::RiotApiError;
use crate::sync::jobs::JobKind;
use crate::utils::fmt_duration;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Client input that can never resolve; rejected before any API call.
    #[error("malformed handle '{0}', expected name#tag")]
    MalformedHandle(String),
    /// Only seen from raw API results; the caller retries it away.
    #[error("quota exhausted, retry after {}s", retry_after.as_secs())]
    QuotaExhausted { retry_after: Duration },
    #[error("still rate limited after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream error: {0:#}")]
    Upstream(anyhow::Error),
    #[error("store error: {0:#}")]
    Store(anyhow::Error),
    /// The waiter gave up. The job itself may still be running.
    #[error("{kind} job did not finish within {}", fmt_duration(*after))]
    JobTimeout { kind: JobKind, after: Duration },
}

impl SyncError {
    pub fn upstream(msg: impl std::fmt::Display) -> Self {
        Self::Upstream(anyhow::anyhow!("{msg}"))
    }
}

impl From<RiotApiError> for SyncError {
    fn from(err: RiotApiError) -> Self {
        match err {
            RiotApiError::QuotaExhausted { retry_after } => Self::QuotaExhausted { retry_after },
            RiotApiError::NotFound(what) => Self::NotFound(what),
            RiotApiError::RequestFailed(e) => Self::Upstream(e),
            e @ RiotApiError::ParseFailed { .. } => Self::Upstream(anyhow::Error::from(e)),
        }
    }
}
