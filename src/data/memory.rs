//! In-process [`Store`] used for dry runs and tests.

use super::models::{MasteryRecord, MatchRecord, PlayerIdentity, PlayerProfile};
use super::store::Store;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Each map entry is locked independently, which gives the same per-row
/// atomicity the Postgres store offers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: DashMap<String, PlayerProfile>,
    identities: DashMap<String, PlayerIdentity>,
    masteries: DashMap<(String, i64), MasteryRecord>,
    matches: DashMap<String, MatchRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn mastery_count(&self) -> usize {
        self.masteries.len()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Masteries of one player ordered by champion id.
    pub fn masteries_for(&self, puuid: &str) -> Vec<MasteryRecord> {
        let mut records: Vec<MasteryRecord> = self
            .masteries
            .iter()
            .filter(|entry| entry.key().0 == puuid)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.champion_id);
        records
    }

    pub fn get_match(&self, match_id: &str) -> Option<MatchRecord> {
        self.matches.get(match_id).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_profile(&self, puuid: &str) -> Result<Option<PlayerProfile>> {
        Ok(self.profiles.get(puuid).map(|entry| entry.value().clone()))
    }

    async fn insert_profile(&self, profile: &PlayerProfile) -> Result<PlayerProfile> {
        let stored = self
            .profiles
            .entry(profile.puuid.clone())
            .or_insert_with(|| profile.clone());
        Ok(stored.value().clone())
    }

    async fn update_profile(&self, profile: &PlayerProfile) -> Result<Option<PlayerProfile>> {
        let Some(mut stored) = self.profiles.get_mut(&profile.puuid) else {
            return Ok(None);
        };
        stored.profile_icon_id = profile.profile_icon_id;
        stored.summoner_level = profile.summoner_level;
        stored.revision_date = profile.revision_date;
        stored.region = profile.region;
        stored.updated_at = profile.updated_at;
        Ok(Some(stored.clone()))
    }

    async fn find_identity(&self, puuid: &str) -> Result<Option<PlayerIdentity>> {
        Ok(self.identities.get(puuid).map(|entry| entry.value().clone()))
    }

    async fn upsert_identity(&self, identity: &PlayerIdentity) -> Result<()> {
        self.identities
            .insert(identity.puuid.clone(), identity.clone());
        Ok(())
    }

    async fn upsert_mastery(&self, record: &MasteryRecord) -> Result<()> {
        self.masteries
            .insert((record.puuid.clone(), record.champion_id), record.clone());
        Ok(())
    }

    async fn insert_match(&self, record: &MatchRecord) -> Result<bool> {
        let mut inserted = false;
        self.matches
            .entry(record.match_id.clone())
            .or_insert_with(|| {
                inserted = true;
                record.clone()
            });
        Ok(inserted)
    }

    async fn match_exists(&self, match_id: &str) -> Result<bool> {
        Ok(self.matches.contains_key(match_id))
    }
}
