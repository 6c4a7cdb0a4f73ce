//! Idempotent writes of resolved entities into the [`Store`].

use crate::data::Store;
use crate::data::models::{MasteryRecord, MatchRecord, PlayerIdentity, PlayerProfile};
use crate::error::SyncError;
use crate::sync::identity::IdentityResolver;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of applying one mastery batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasteryReport {
    pub applied: usize,
    /// `(champion_id, error)` for every record that was not written.
    pub failed: Vec<(i64, String)>,
}

impl MasteryReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchIngest {
    AlreadyPresent,
    Inserted {
        participants_resolved: usize,
        participants_failed: usize,
    },
}

#[derive(Clone)]
pub struct EntityUpserter {
    store: Arc<dyn Store>,
    resolver: IdentityResolver,
}

impl EntityUpserter {
    pub fn new(store: Arc<dyn Store>, resolver: IdentityResolver) -> Self {
        Self { store, resolver }
    }

    pub async fn upsert_identity(&self, identity: &PlayerIdentity) -> Result<(), SyncError> {
        self.store
            .upsert_identity(identity)
            .await
            .map_err(SyncError::Store)
    }

    /// Insert the profile unless one exists. Returns whatever row is stored,
    /// so the first write wins. New rows are stamped with the current time.
    pub async fn upsert_profile(&self, profile: &PlayerProfile) -> Result<PlayerProfile, SyncError> {
        self.sync_profile(profile, false).await
    }

    /// Like [`upsert_profile`](Self::upsert_profile), but an existing row is
    /// refreshed instead of kept when `overwrite` is set.
    pub async fn sync_profile(
        &self,
        profile: &PlayerProfile,
        overwrite: bool,
    ) -> Result<PlayerProfile, SyncError> {
        let existing = self
            .store
            .find_profile(&profile.puuid)
            .await
            .map_err(SyncError::Store)?;

        match existing {
            Some(_) if overwrite => self.refresh_profile(profile).await,
            Some(existing) => Ok(existing),
            None => {
                let now = Utc::now();
                let profile = PlayerProfile {
                    created_at: now,
                    updated_at: now,
                    ..profile.clone()
                };
                self.store
                    .insert_profile(&profile)
                    .await
                    .map_err(SyncError::Store)
            }
        }
    }

    /// Overwrite the summoner fields of an existing row. `created_at` is kept.
    pub async fn refresh_profile(&self, profile: &PlayerProfile) -> Result<PlayerProfile, SyncError> {
        self.store
            .update_profile(profile)
            .await
            .map_err(SyncError::Store)?
            .ok_or_else(|| {
                SyncError::Store(anyhow::anyhow!(
                    "no stored profile for puuid {}",
                    profile.puuid
                ))
            })
    }

    /// Apply every record independently. Failures are collected, never fatal.
    pub async fn upsert_masteries(&self, puuid: &str, records: &[MasteryRecord]) -> MasteryReport {
        let results = join_all(records.iter().map(|record| async move {
            if record.puuid != puuid {
                return Err((
                    record.champion_id,
                    format!("belongs to {} not {puuid}", record.puuid),
                ));
            }
            self.store
                .upsert_mastery(record)
                .await
                .map_err(|e| (record.champion_id, format!("{e:#}")))
        }))
        .await;

        let mut report = MasteryReport::default();
        for result in results {
            match result {
                Ok(()) => report.applied += 1,
                Err((champion_id, error)) => {
                    warn!(puuid, champion_id, error = %error, "Mastery record not applied");
                    report.failed.push((champion_id, error));
                }
            }
        }
        report
    }

    pub async fn match_exists(&self, match_id: &str) -> Result<bool, SyncError> {
        self.store
            .match_exists(match_id)
            .await
            .map_err(SyncError::Store)
    }

    /// Store a match once. Participants without a local profile are resolved
    /// and stored first; their failures are counted, not propagated.
    pub async fn upsert_match(&self, record: &MatchRecord) -> Result<MatchIngest, SyncError> {
        if self.match_exists(&record.match_id).await? {
            return Ok(MatchIngest::AlreadyPresent);
        }

        let mut resolved = 0;
        let mut failed = 0;
        let mut seen = HashSet::new();
        for puuid in record.participant_puuids() {
            if !seen.insert(puuid) {
                continue;
            }
            match self.ensure_participant(puuid, record).await {
                Ok(true) => resolved += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(match_id = %record.match_id, puuid, error = %e, "Could not resolve participant");
                    failed += 1;
                }
            }
        }

        let inserted = self
            .store
            .insert_match(record)
            .await
            .map_err(SyncError::Store)?;
        if !inserted {
            debug!(match_id = %record.match_id, "Match stored concurrently");
            return Ok(MatchIngest::AlreadyPresent);
        }

        Ok(MatchIngest::Inserted {
            participants_resolved: resolved,
            participants_failed: failed,
        })
    }

    /// Returns whether a new participant was stored.
    async fn ensure_participant(&self, puuid: &str, record: &MatchRecord) -> Result<bool, SyncError> {
        if self
            .store
            .find_profile(puuid)
            .await
            .map_err(SyncError::Store)?
            .is_some()
        {
            return Ok(false);
        }

        let (identity, profile) = self.resolver.resolve_by_id(puuid, record.region).await?;
        self.upsert_identity(&identity).await?;
        self.upsert_profile(&profile).await?;
        Ok(true)
    }
}
