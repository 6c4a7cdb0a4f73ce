//! The persistence seam used by the upserter.

use super::models::{MasteryRecord, MatchRecord, PlayerIdentity, PlayerProfile};
use anyhow::Result;
use async_trait::async_trait;

/// Key-addressed storage. Every method is atomic for the row(s) it touches;
/// callers never rely on isolation across calls.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_profile(&self, puuid: &str) -> Result<Option<PlayerProfile>>;

    /// Insert if no row exists for `profile.puuid`; returns whichever row is stored.
    async fn insert_profile(&self, profile: &PlayerProfile) -> Result<PlayerProfile>;

    /// Overwrite the summoner fields of an existing row, keeping `created_at`.
    /// Returns `None` when there is no row to update.
    async fn update_profile(&self, profile: &PlayerProfile) -> Result<Option<PlayerProfile>>;

    async fn find_identity(&self, puuid: &str) -> Result<Option<PlayerIdentity>>;

    /// Record the latest name and tag for a puuid.
    async fn upsert_identity(&self, identity: &PlayerIdentity) -> Result<()>;

    /// Insert or overwrite the row keyed by `(puuid, champion_id)`.
    async fn upsert_mastery(&self, record: &MasteryRecord) -> Result<()>;

    /// Insert a match with its participants unless the id is already stored.
    /// Returns whether a row was written.
    async fn insert_match(&self, record: &MatchRecord) -> Result<bool>;

    async fn match_exists(&self, match_id: &str) -> Result<bool>;
}
