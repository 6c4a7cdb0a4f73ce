//! Resolution of player handles and ids against the Riot API.

use crate::data::models::{MasteryRecord, PlayerIdentity, PlayerProfile};
use crate::error::SyncError;
use crate::riot::models::MatchDto;
use crate::riot::{RateLimitedCaller, Region, RiotApi};
use chrono::Utc;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

const HANDLE_SEPARATOR: char = '#';

/// A `name#tag` handle as typed by a player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    pub game_name: String,
    pub tag_line: String,
}

impl FromStr for Handle {
    type Err = SyncError;

    /// Exactly one separator with a non-empty part on each side.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || SyncError::MalformedHandle(raw.to_owned());
        let mut parts = raw.trim().split(HANDLE_SEPARATOR);
        let (Some(name), Some(tag), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        let (name, tag) = (name.trim(), tag.trim());
        if name.is_empty() || tag.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            game_name: name.to_owned(),
            tag_line: tag.to_owned(),
        })
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{HANDLE_SEPARATOR}{}", self.game_name, self.tag_line)
    }
}

/// Turns handles and puuids into identities and profiles. Every request goes
/// through the shared [`RateLimitedCaller`].
#[derive(Clone)]
pub struct IdentityResolver {
    api: Arc<dyn RiotApi>,
    caller: RateLimitedCaller,
}

impl IdentityResolver {
    pub fn new(api: Arc<dyn RiotApi>, caller: RateLimitedCaller) -> Self {
        Self { api, caller }
    }

    /// Parse `handle` and look the account up. Malformed handles never reach the API.
    pub async fn resolve_by_handle(
        &self,
        handle: &str,
        region: Region,
    ) -> Result<PlayerIdentity, SyncError> {
        let handle: Handle = handle.parse()?;
        self.resolve_by_riot_id(&handle.game_name, &handle.tag_line, region)
            .await
    }

    pub async fn resolve_by_riot_id(
        &self,
        game_name: &str,
        tag_line: &str,
        region: Region,
    ) -> Result<PlayerIdentity, SyncError> {
        let api = self.api.as_ref();
        let account = self
            .caller
            .call("account_by_riot_id", move || {
                api.account_by_riot_id(game_name, tag_line, region)
            })
            .await?;
        debug!(puuid = %account.puuid, game_name, tag_line, %region, "Resolved handle");
        Ok(account.into_identity(region))
    }

    /// Account lookup followed by the summoner lookup. A missing account is an
    /// upstream inconsistency, so the second call is never made for it.
    pub async fn resolve_by_id(
        &self,
        puuid: &str,
        region: Region,
    ) -> Result<(PlayerIdentity, PlayerProfile), SyncError> {
        let api = self.api.as_ref();
        let account = self
            .caller
            .call("account_by_puuid", move || api.account_by_puuid(puuid, region))
            .await
            .map_err(|e| match e {
                SyncError::NotFound(_) => {
                    SyncError::upstream(format!("no account for puuid {puuid} in {region}"))
                }
                other => other,
            })?;

        let identity = account.into_identity(region);
        let profile = self.fetch_profile(&identity.puuid, region).await?;
        Ok((identity, profile))
    }

    /// Summoner lookup for an already resolved puuid.
    pub async fn fetch_profile(
        &self,
        puuid: &str,
        region: Region,
    ) -> Result<PlayerProfile, SyncError> {
        let api = self.api.as_ref();
        let summoner = self
            .caller
            .call("summoner_by_puuid", move || api.summoner_by_puuid(puuid, region))
            .await?;
        Ok(summoner.into_profile(region, Utc::now()))
    }

    pub async fn fetch_masteries(
        &self,
        puuid: &str,
        region: Region,
    ) -> Result<Vec<MasteryRecord>, SyncError> {
        let api = self.api.as_ref();
        let masteries = self
            .caller
            .call("masteries_by_puuid", move || api.masteries_by_puuid(puuid, region))
            .await?;
        Ok(masteries.into_iter().map(MasteryRecord::from).collect())
    }

    pub async fn fetch_recent_match_ids(
        &self,
        puuid: &str,
        region: Region,
        count: u32,
    ) -> Result<Vec<String>, SyncError> {
        let api = self.api.as_ref();
        self.caller
            .call("match_ids_by_puuid", move || {
                api.match_ids_by_puuid(puuid, region, count)
            })
            .await
    }

    pub async fn fetch_match(&self, match_id: &str) -> Result<MatchDto, SyncError> {
        let api = self.api.as_ref();
        self.caller
            .call("match_by_id", move || api.match_by_id(match_id))
            .await
    }
}
