//! Error types for the Riot API client.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RiotApiError {
    /// HTTP 429. `retry_after` comes from the `Retry-After` header.
    #[error("Riot API quota exhausted, retry after {}s", retry_after.as_secs())]
    QuotaExhausted { retry_after: Duration },
    #[error("Riot API resource not found: {0}")]
    NotFound(String),
    #[error("Failed to parse response")]
    ParseFailed {
        status: u16,
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    RequestFailed(#[from] anyhow::Error),
}

impl RiotApiError {
    pub fn quota(retry_after_secs: u64) -> Self {
        Self::QuotaExhausted {
            retry_after: Duration::from_secs(retry_after_secs),
        }
    }
}

impl From<reqwest_middleware::Error> for RiotApiError {
    fn from(err: reqwest_middleware::Error) -> Self {
        Self::RequestFailed(anyhow::Error::from(err))
    }
}

impl From<reqwest::Error> for RiotApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(anyhow::Error::from(err))
    }
}
