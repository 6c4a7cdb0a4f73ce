//! Domain records persisted by the store.

use crate::riot::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An upstream account. `puuid` is the only stable key; name and tag change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerIdentity {
    pub puuid: String,
    pub game_name: String,
    pub tag_line: String,
    pub region: Region,
}

impl PlayerIdentity {
    /// `name#tag` as shown to players.
    pub fn handle(&self) -> String {
        format!("{}#{}", self.game_name, self.tag_line)
    }
}

/// Summoner profile, one row per `puuid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerProfile {
    pub puuid: String,
    pub profile_icon_id: i32,
    pub summoner_level: i64,
    pub revision_date: DateTime<Utc>,
    pub region: Region,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mastery of one champion, keyed by `(puuid, champion_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MasteryRecord {
    pub puuid: String,
    pub champion_id: i64,
    pub champion_level: i32,
    pub champion_points: i64,
    pub last_play_time: DateTime<Utc>,
    pub tokens_earned: i32,
    pub chest_granted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchParticipant {
    pub puuid: String,
    pub champion_id: i64,
    pub team_id: i32,
    pub win: bool,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
}

/// A finished match. Stored once; re-ingestion never touches it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub region: Region,
    pub game_creation: DateTime<Utc>,
    pub game_duration_secs: i64,
    pub game_mode: String,
    pub queue_id: i32,
    pub game_version: String,
    pub participants: Vec<MatchParticipant>,
}

impl MatchRecord {
    pub fn participant_puuids(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.puuid.as_str())
    }
}
