//! Fakes shared by the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use riftsync::data::models::{MasteryRecord, MatchRecord, PlayerIdentity, PlayerProfile};
use riftsync::data::{MemoryStore, Store};
use riftsync::riot::models::{
    AccountDto, ChampionMasteryDto, MatchDto, MatchInfoDto, MatchMetadataDto, ParticipantDto,
    SummonerDto,
};
use riftsync::riot::{RateLimitedCaller, Region, RiotApi, RiotApiError};
use riftsync::sync::worker::{JobRunner, JobSettings};
use riftsync::sync::{EntityUpserter, IdentityResolver, PipelineSettings, SyncService};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ACCOUNT_BY_RIOT_ID: &str = "account_by_riot_id";
pub const ACCOUNT_BY_PUUID: &str = "account_by_puuid";
pub const SUMMONER_BY_PUUID: &str = "summoner_by_puuid";
pub const MASTERIES_BY_PUUID: &str = "masteries_by_puuid";
pub const MATCH_IDS_BY_PUUID: &str = "match_ids_by_puuid";
pub const MATCH_BY_ID: &str = "match_by_id";

/// In-memory Riot API with call recording, per-endpoint delays and
/// scripted quota failures. Configure it before wrapping it in an `Arc`.
#[derive(Default)]
pub struct FakeRiotApi {
    handles: HashMap<(String, String), String>,
    accounts: HashMap<String, AccountDto>,
    summoners: HashMap<String, SummonerDto>,
    masteries: HashMap<String, Vec<ChampionMasteryDto>>,
    match_ids: HashMap<String, Vec<String>>,
    matches: HashMap<String, MatchDto>,
    broken_matches: HashSet<String>,
    broken_endpoints: HashSet<&'static str>,
    delays: HashMap<&'static str, Duration>,
    quota_failures: HashMap<&'static str, AtomicU32>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeRiotApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// A player with a summoner and two champion masteries.
    pub fn with_player(mut self, game_name: &str, tag_line: &str, puuid: &str) -> Self {
        self.handles.insert(
            (game_name.to_lowercase(), tag_line.to_lowercase()),
            puuid.to_owned(),
        );
        self.accounts.insert(
            puuid.to_owned(),
            AccountDto {
                puuid: puuid.to_owned(),
                game_name: Some(game_name.to_owned()),
                tag_line: Some(tag_line.to_owned()),
            },
        );
        self.summoners.insert(puuid.to_owned(), summoner(puuid, 120));
        self.masteries.insert(
            puuid.to_owned(),
            vec![mastery(puuid, 103, 50_000), mastery(puuid, 22, 12_000)],
        );
        self
    }

    /// A player only reachable by puuid, as seen through match participants.
    pub fn with_participant(self, puuid: &str) -> Self {
        self.with_player(&format!("player-{puuid}"), "EUW", puuid)
    }

    pub fn with_match(mut self, match_id: &str, participants: &[&str]) -> Self {
        self.matches
            .insert(match_id.to_owned(), match_dto(match_id, participants));
        self
    }

    pub fn with_match_ids(mut self, puuid: &str, ids: &[&str]) -> Self {
        self.match_ids
            .insert(puuid.to_owned(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    /// `match_by_id` fails with a server error for this id.
    pub fn with_broken_match(mut self, match_id: &str) -> Self {
        self.broken_matches.insert(match_id.to_owned());
        self
    }

    /// Every call to `endpoint` fails with a server error.
    pub fn with_broken_endpoint(mut self, endpoint: &'static str) -> Self {
        self.broken_endpoints.insert(endpoint);
        self
    }

    pub fn with_delay(mut self, endpoint: &'static str, delay: Duration) -> Self {
        self.delays.insert(endpoint, delay);
        self
    }

    /// The first `count` calls to `endpoint` answer 429 with `Retry-After: 1`.
    pub fn with_quota_failures(mut self, endpoint: &'static str, count: u32) -> Self {
        self.quota_failures.insert(endpoint, AtomicU32::new(count));
        self
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.call_log().iter().filter(|c| **c == endpoint).count()
    }

    pub fn total_calls(&self) -> usize {
        self.call_log().len()
    }

    pub fn call_log(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, endpoint: &'static str) -> Result<(), RiotApiError> {
        self.calls.lock().unwrap().push(endpoint);
        if let Some(delay) = self.delays.get(endpoint) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(remaining) = self.quota_failures.get(endpoint) {
            let throttled = remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if throttled {
                return Err(RiotApiError::quota(1));
            }
        }
        if self.broken_endpoints.contains(endpoint) {
            return Err(server_error());
        }
        Ok(())
    }
}

fn server_error() -> RiotApiError {
    RiotApiError::RequestFailed(anyhow::anyhow!("Riot API returned 503 Service Unavailable"))
}

fn not_found(what: &str) -> RiotApiError {
    RiotApiError::NotFound(what.to_owned())
}

#[async_trait]
impl RiotApi for FakeRiotApi {
    async fn account_by_riot_id(
        &self,
        game_name: &str,
        tag_line: &str,
        _region: Region,
    ) -> Result<AccountDto, RiotApiError> {
        self.enter(ACCOUNT_BY_RIOT_ID).await?;
        self.handles
            .get(&(game_name.to_lowercase(), tag_line.to_lowercase()))
            .and_then(|puuid| self.accounts.get(puuid))
            .cloned()
            .ok_or_else(|| not_found("/riot/account/v1/accounts/by-riot-id"))
    }

    async fn account_by_puuid(
        &self,
        puuid: &str,
        _region: Region,
    ) -> Result<AccountDto, RiotApiError> {
        self.enter(ACCOUNT_BY_PUUID).await?;
        self.accounts
            .get(puuid)
            .cloned()
            .ok_or_else(|| not_found("/riot/account/v1/accounts/by-puuid"))
    }

    async fn summoner_by_puuid(
        &self,
        puuid: &str,
        _region: Region,
    ) -> Result<SummonerDto, RiotApiError> {
        self.enter(SUMMONER_BY_PUUID).await?;
        self.summoners
            .get(puuid)
            .cloned()
            .ok_or_else(|| not_found("/lol/summoner/v4/summoners/by-puuid"))
    }

    async fn masteries_by_puuid(
        &self,
        puuid: &str,
        _region: Region,
    ) -> Result<Vec<ChampionMasteryDto>, RiotApiError> {
        self.enter(MASTERIES_BY_PUUID).await?;
        Ok(self.masteries.get(puuid).cloned().unwrap_or_default())
    }

    async fn match_ids_by_puuid(
        &self,
        puuid: &str,
        _region: Region,
        count: u32,
    ) -> Result<Vec<String>, RiotApiError> {
        self.enter(MATCH_IDS_BY_PUUID).await?;
        let ids = self.match_ids.get(puuid).cloned().unwrap_or_default();
        Ok(ids.into_iter().take(count as usize).collect())
    }

    async fn match_by_id(&self, match_id: &str) -> Result<MatchDto, RiotApiError> {
        self.enter(MATCH_BY_ID).await?;
        if self.broken_matches.contains(match_id) {
            return Err(server_error());
        }
        self.matches
            .get(match_id)
            .cloned()
            .ok_or_else(|| not_found("/lol/match/v5/matches"))
    }
}

pub fn summoner(puuid: &str, level: i64) -> SummonerDto {
    SummonerDto {
        puuid: puuid.to_owned(),
        profile_icon_id: 4568,
        revision_date: 1_700_000_000_000,
        summoner_level: level,
    }
}

pub fn mastery(puuid: &str, champion_id: i64, points: i64) -> ChampionMasteryDto {
    ChampionMasteryDto {
        puuid: puuid.to_owned(),
        champion_id,
        champion_level: 7,
        champion_points: points,
        last_play_time: 1_700_000_000_000,
        tokens_earned: 0,
        chest_granted: false,
    }
}

pub fn match_dto(match_id: &str, participants: &[&str]) -> MatchDto {
    MatchDto {
        metadata: MatchMetadataDto {
            match_id: match_id.to_owned(),
            participants: participants.iter().map(|p| p.to_string()).collect(),
        },
        info: MatchInfoDto {
            game_creation: 1_700_000_000_000,
            game_duration: 1834,
            game_end_timestamp: Some(1_700_001_900_000),
            game_mode: "CLASSIC".to_owned(),
            game_version: "13.22.541.3232".to_owned(),
            queue_id: 420,
            participants: participants
                .iter()
                .enumerate()
                .map(|(i, puuid)| ParticipantDto {
                    puuid: puuid.to_string(),
                    champion_id: 100 + i as i64,
                    team_id: if i % 2 == 0 { 100 } else { 200 },
                    win: i % 2 == 0,
                    kills: 3,
                    deaths: 4,
                    assists: 5,
                })
                .collect(),
        },
    }
}

pub fn resolver(api: Arc<FakeRiotApi>) -> IdentityResolver {
    IdentityResolver::new(api, RateLimitedCaller::default())
}

pub fn upserter(api: Arc<FakeRiotApi>, store: Arc<dyn Store>) -> EntityUpserter {
    EntityUpserter::new(store, resolver(api))
}

pub fn job_settings() -> JobSettings {
    JobSettings {
        match_page_size: 20,
        refresh_existing_profiles: false,
    }
}

/// Full pipeline over the fake API and an in-memory store.
pub fn pipeline(
    api: Arc<FakeRiotApi>,
    store: Arc<MemoryStore>,
    settings: PipelineSettings,
) -> SyncService {
    let resolver = resolver(api);
    let upserter = EntityUpserter::new(store, resolver.clone());
    let runner = Arc::new(JobRunner::new(resolver, upserter, job_settings()));
    SyncService::start(runner, settings)
}

/// Delegates to a [`MemoryStore`] but fails mastery writes for chosen champions.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing_champions: HashSet<i64>,
}

impl FlakyStore {
    pub fn failing_masteries(champions: &[i64]) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_champions: champions.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn find_profile(&self, puuid: &str) -> Result<Option<PlayerProfile>> {
        self.inner.find_profile(puuid).await
    }

    async fn insert_profile(&self, profile: &PlayerProfile) -> Result<PlayerProfile> {
        self.inner.insert_profile(profile).await
    }

    async fn update_profile(&self, profile: &PlayerProfile) -> Result<Option<PlayerProfile>> {
        self.inner.update_profile(profile).await
    }

    async fn find_identity(&self, puuid: &str) -> Result<Option<PlayerIdentity>> {
        self.inner.find_identity(puuid).await
    }

    async fn upsert_identity(&self, identity: &PlayerIdentity) -> Result<()> {
        self.inner.upsert_identity(identity).await
    }

    async fn upsert_mastery(&self, record: &MasteryRecord) -> Result<()> {
        if self.failing_champions.contains(&record.champion_id) {
            anyhow::bail!("connection reset while writing champion {}", record.champion_id);
        }
        self.inner.upsert_mastery(record).await
    }

    async fn insert_match(&self, record: &MatchRecord) -> Result<bool> {
        self.inner.insert_match(record).await
    }

    async fn match_exists(&self, match_id: &str) -> Result<bool> {
        self.inner.match_exists(match_id).await
    }
}
