//! HTTP middleware for the Riot client.

use crate::utils::fmt_duration;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(2);

/// Logs method, path, status and latency of every request. Headers are never
/// logged since they carry the API key.
pub struct RequestLogger;

#[async_trait::async_trait]
impl Middleware for RequestLogger {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let method = req.method().clone();
        let host = req.url().host_str().unwrap_or_default().to_owned();
        let path = req.url().path().to_owned();
        let start = Instant::now();

        let result = next.run(req, extensions).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) if response.status().is_success() => {
                if duration > SLOW_REQUEST_THRESHOLD {
                    warn!(%method, host, path, duration = fmt_duration(duration), "Slow Riot API request");
                } else {
                    trace!(%method, host, path, status = response.status().as_u16(), duration = fmt_duration(duration), "Riot API request");
                }
            }
            Ok(response) => {
                debug!(%method, host, path, status = response.status().as_u16(), duration = fmt_duration(duration), "Riot API request returned error status");
            }
            Err(e) => {
                warn!(%method, host, path, duration = fmt_duration(duration), error = ?e, "Riot API request failed");
            }
        }

        result
    }
}
