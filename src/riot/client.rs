//! reqwest-backed implementation of [`RiotApi`].

use super::errors::RiotApiError;
use super::json::decode_body;
use super::middleware::RequestLogger;
use super::models::{AccountDto, ChampionMasteryDto, MatchDto, SummonerDto};
use super::{Cluster, Region, RiotApi};
use anyhow::Context;
use async_trait::async_trait;
use http::{HeaderMap, StatusCode, header::RETRY_AFTER};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;
use urlencoding::encode;

/// Used when a 429 arrives without a parseable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Longest error body excerpt carried into error messages.
const ERROR_BODY_LIMIT: usize = 200;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Which host serves an endpoint.
#[derive(Debug, Clone, Copy)]
enum Routing {
    Platform(Region),
    Cluster(Cluster),
}

impl Routing {
    fn host_label(self) -> String {
        match self {
            Routing::Platform(region) => region.platform().to_ascii_lowercase(),
            Routing::Cluster(cluster) => cluster.as_str().to_owned(),
        }
    }
}

pub struct RiotClient {
    http: ClientWithMiddleware,
    api_key: String,
    /// Replaces the per-region hosts, for pointing at a local mock.
    base_override: Option<Url>,
}

impl RiotClient {
    pub fn new(api_key: String, base_override: Option<&str>) -> anyhow::Result<Self> {
        let base_override = base_override
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid Riot base URL '{raw}'")))
            .transpose()?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("riftsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http: ClientBuilder::new(http).with(RequestLogger).build(),
            api_key,
            base_override,
        })
    }

    fn url(&self, routing: Routing, path: &str) -> Result<Url, RiotApiError> {
        let base = match &self.base_override {
            Some(base) => base.clone(),
            None => Url::parse(&format!("https://{}.api.riotgames.com", routing.host_label()))
                .context("invalid Riot host")?,
        };
        Ok(base.join(path).context("invalid Riot API path")?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        routing: Routing,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RiotApiError> {
        let url = self.url(routing, path)?;
        let response = self
            .http
            .get(url.clone())
            .header("X-Riot-Token", &self.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(RiotApiError::quota(retry_after_secs(response.headers())));
            }
            StatusCode::NOT_FOUND => return Err(RiotApiError::NotFound(path.to_owned())),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
                return Err(RiotApiError::RequestFailed(anyhow::anyhow!(
                    "Riot API returned {status} for {}: {excerpt}",
                    url.path()
                )));
            }
            _ => {}
        }

        let body = response.text().await?;
        decode_body(&body, status.as_u16(), url.as_str())
    }
}

/// Seconds to wait according to a 429's `Retry-After` header.
fn retry_after_secs(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

#[async_trait]
impl RiotApi for RiotClient {
    async fn account_by_riot_id(
        &self,
        game_name: &str,
        tag_line: &str,
        region: Region,
    ) -> Result<AccountDto, RiotApiError> {
        let path = format!(
            "/riot/account/v1/accounts/by-riot-id/{}/{}",
            encode(game_name),
            encode(tag_line)
        );
        self.get_json(Routing::Cluster(region.cluster()), &path, &[])
            .await
    }

    async fn account_by_puuid(
        &self,
        puuid: &str,
        region: Region,
    ) -> Result<AccountDto, RiotApiError> {
        let path = format!("/riot/account/v1/accounts/by-puuid/{}", encode(puuid));
        self.get_json(Routing::Cluster(region.cluster()), &path, &[])
            .await
    }

    async fn summoner_by_puuid(
        &self,
        puuid: &str,
        region: Region,
    ) -> Result<SummonerDto, RiotApiError> {
        let path = format!("/lol/summoner/v4/summoners/by-puuid/{}", encode(puuid));
        self.get_json(Routing::Platform(region), &path, &[]).await
    }

    async fn masteries_by_puuid(
        &self,
        puuid: &str,
        region: Region,
    ) -> Result<Vec<ChampionMasteryDto>, RiotApiError> {
        let path = format!(
            "/lol/champion-mastery/v4/champion-masteries/by-puuid/{}",
            encode(puuid)
        );
        self.get_json(Routing::Platform(region), &path, &[]).await
    }

    async fn match_ids_by_puuid(
        &self,
        puuid: &str,
        region: Region,
        count: u32,
    ) -> Result<Vec<String>, RiotApiError> {
        let path = format!("/lol/match/v5/matches/by-puuid/{}/ids", encode(puuid));
        let query = [("start", "0".to_owned()), ("count", count.to_string())];
        self.get_json(Routing::Cluster(region.cluster()), &path, &query)
            .await
    }

    async fn match_by_id(&self, match_id: &str) -> Result<MatchDto, RiotApiError> {
        let region = Region::from_match_id(match_id).ok_or_else(|| {
            RiotApiError::RequestFailed(anyhow::anyhow!(
                "match id '{match_id}' has no region prefix"
            ))
        })?;
        let path = format!("/lol/match/v5/matches/{}", encode(match_id));
        self.get_json(Routing::Cluster(region.cluster()), &path, &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn retry_after_reads_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("17"));
        assert_eq!(retry_after_secs(&headers), 17);
    }

    #[test]
    fn retry_after_defaults_when_missing_or_garbled() {
        assert_eq!(retry_after_secs(&HeaderMap::new()), DEFAULT_RETRY_AFTER_SECS);

        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_secs(&headers), DEFAULT_RETRY_AFTER_SECS);
    }

    #[test]
    fn builds_platform_and_cluster_urls() {
        let client = RiotClient::new("key".to_owned(), None).unwrap();
        let platform = client
            .url(Routing::Platform(Region::Euw1), "/lol/summoner/v4/x")
            .unwrap();
        assert_eq!(
            platform.as_str(),
            "https://euw1.api.riotgames.com/lol/summoner/v4/x"
        );

        let cluster = client
            .url(Routing::Cluster(Region::Kr.cluster()), "/riot/account/v1/y")
            .unwrap();
        assert_eq!(cluster.as_str(), "https://asia.api.riotgames.com/riot/account/v1/y");
    }

    #[test]
    fn base_override_replaces_host() {
        let client = RiotClient::new("key".to_owned(), Some("http://127.0.0.1:8080")).unwrap();
        let url = client
            .url(Routing::Platform(Region::Na1), "/lol/summoner/v4/x")
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/lol/summoner/v4/x");
    }

    #[test]
    fn riot_id_segments_are_percent_encoded() {
        assert_eq!(encode("Faker Fan"), "Faker%20Fan");
        assert_eq!(encode("Über#"), "%C3%9Cber%23");
    }
}
