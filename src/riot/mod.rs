//! Riot Games API access: the [`RiotApi`] seam, its reqwest implementation
//! and the rate-limit-aware caller every request goes through.

pub mod caller;
pub mod client;
pub mod errors;
pub mod json;
mod middleware;
pub mod models;
pub mod region;

pub use caller::{MAX_ATTEMPTS, RateLimitedCaller, Sleeper, TokioSleeper};
pub use client::RiotClient;
pub use errors::RiotApiError;
pub use region::{Cluster, Region};

use async_trait::async_trait;
use models::{AccountDto, ChampionMasteryDto, MatchDto, SummonerDto};

/// The upstream endpoints consumed by the sync pipeline.
///
/// Every method may fail with [`RiotApiError::QuotaExhausted`]; callers are
/// expected to go through [`RateLimitedCaller`].
#[async_trait]
pub trait RiotApi: Send + Sync {
    async fn account_by_riot_id(
        &self,
        game_name: &str,
        tag_line: &str,
        region: Region,
    ) -> Result<AccountDto, RiotApiError>;

    async fn account_by_puuid(&self, puuid: &str, region: Region)
    -> Result<AccountDto, RiotApiError>;

    async fn summoner_by_puuid(
        &self,
        puuid: &str,
        region: Region,
    ) -> Result<SummonerDto, RiotApiError>;

    async fn masteries_by_puuid(
        &self,
        puuid: &str,
        region: Region,
    ) -> Result<Vec<ChampionMasteryDto>, RiotApiError>;

    /// Most recent match ids first.
    async fn match_ids_by_puuid(
        &self,
        puuid: &str,
        region: Region,
        count: u32,
    ) -> Result<Vec<String>, RiotApiError>;

    async fn match_by_id(&self, match_id: &str) -> Result<MatchDto, RiotApiError>;
}
