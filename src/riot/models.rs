//! Wire types for the subset of Riot API fields this service consumes.

use crate::data::models::{
    MasteryRecord, MatchParticipant, MatchRecord, PlayerIdentity, PlayerProfile,
};
use crate::riot::Region;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `account-v1` account. Name and tag are absent for accounts that never set one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub puuid: String,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub tag_line: Option<String>,
}

impl AccountDto {
    pub fn into_identity(self, region: Region) -> PlayerIdentity {
        PlayerIdentity {
            puuid: self.puuid,
            game_name: self.game_name.unwrap_or_default(),
            tag_line: self.tag_line.unwrap_or_default(),
            region,
        }
    }
}

/// `summoner-v4` summoner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonerDto {
    pub puuid: String,
    pub profile_icon_id: i32,
    /// Epoch milliseconds.
    pub revision_date: i64,
    pub summoner_level: i64,
}

impl SummonerDto {
    /// Timestamps are left for the upserter to decide.
    pub fn into_profile(self, region: Region, now: DateTime<Utc>) -> PlayerProfile {
        PlayerProfile {
            puuid: self.puuid,
            profile_icon_id: self.profile_icon_id,
            summoner_level: self.summoner_level,
            revision_date: from_epoch_millis(self.revision_date),
            region,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `champion-mastery-v4` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionMasteryDto {
    pub puuid: String,
    pub champion_id: i64,
    pub champion_level: i32,
    pub champion_points: i64,
    pub last_play_time: i64,
    #[serde(default)]
    pub tokens_earned: i32,
    #[serde(default)]
    pub chest_granted: bool,
}

impl From<ChampionMasteryDto> for MasteryRecord {
    fn from(dto: ChampionMasteryDto) -> Self {
        Self {
            puuid: dto.puuid,
            champion_id: dto.champion_id,
            champion_level: dto.champion_level,
            champion_points: dto.champion_points,
            last_play_time: from_epoch_millis(dto.last_play_time),
            tokens_earned: dto.tokens_earned,
            chest_granted: dto.chest_granted,
        }
    }
}

/// `match-v5` match.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchDto {
    pub metadata: MatchMetadataDto,
    pub info: MatchInfoDto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadataDto {
    pub match_id: String,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfoDto {
    /// Epoch milliseconds.
    pub game_creation: i64,
    /// Seconds since patch 11.20, milliseconds before.
    pub game_duration: i64,
    #[serde(default)]
    pub game_end_timestamp: Option<i64>,
    pub game_mode: String,
    pub game_version: String,
    pub queue_id: i32,
    pub participants: Vec<ParticipantDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub puuid: String,
    pub champion_id: i64,
    pub team_id: i32,
    pub win: bool,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
}

impl MatchDto {
    /// Convert into a record. `fallback` is used when the id has no region prefix.
    pub fn into_record(self, fallback: Region) -> MatchRecord {
        let region = Region::from_match_id(&self.metadata.match_id).unwrap_or(fallback);
        // Old matches report duration in milliseconds and carry no end timestamp
        let game_duration_secs = match self.info.game_end_timestamp {
            Some(_) => self.info.game_duration,
            None => self.info.game_duration / 1000,
        };

        MatchRecord {
            match_id: self.metadata.match_id,
            region,
            game_creation: from_epoch_millis(self.info.game_creation),
            game_duration_secs,
            game_mode: self.info.game_mode,
            queue_id: self.info.queue_id,
            game_version: self.info.game_version,
            participants: self
                .info
                .participants
                .into_iter()
                .map(|p| MatchParticipant {
                    puuid: p.puuid,
                    champion_id: p.champion_id,
                    team_id: p.team_id,
                    win: p.win,
                    kills: p.kills,
                    deaths: p.deaths,
                    assists: p.assists,
                })
                .collect(),
        }
    }
}

fn from_epoch_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCH_JSON: &str = r#"{
        "metadata": { "matchId": "EUW1_6712345678", "participants": ["p1", "p2"] },
        "info": {
            "gameCreation": 1700000000000,
            "gameDuration": 1834,
            "gameEndTimestamp": 1700001900000,
            "gameMode": "CLASSIC",
            "gameVersion": "13.22.541.3232",
            "queueId": 420,
            "participants": [
                { "puuid": "p1", "championId": 103, "teamId": 100, "win": true, "kills": 7, "deaths": 2, "assists": 11 },
                { "puuid": "p2", "championId": 22, "teamId": 200, "win": false, "kills": 1, "deaths": 6, "assists": 3 }
            ]
        }
    }"#;

    #[test]
    fn match_converts_with_region_from_id() {
        let dto: MatchDto = serde_json::from_str(MATCH_JSON).unwrap();
        let record = dto.into_record(Region::Na1);

        assert_eq!(record.region, Region::Euw1);
        assert_eq!(record.game_duration_secs, 1834);
        assert_eq!(record.queue_id, 420);
        assert_eq!(
            record.participant_puuids().collect::<Vec<_>>(),
            vec!["p1", "p2"]
        );
        assert!(record.participants[0].win);
    }

    #[test]
    fn legacy_match_duration_is_scaled_to_seconds() {
        let mut dto: MatchDto = serde_json::from_str(MATCH_JSON).unwrap();
        dto.info.game_end_timestamp = None;
        dto.info.game_duration = 1_834_000;
        assert_eq!(dto.into_record(Region::Euw1).game_duration_secs, 1834);
    }

    #[test]
    fn mastery_defaults_missing_optional_fields() {
        let dto: ChampionMasteryDto = serde_json::from_str(
            r#"{"puuid":"p1","championId":99,"championLevel":7,"championPoints":250000,"lastPlayTime":1700000000000}"#,
        )
        .unwrap();
        let record = MasteryRecord::from(dto);
        assert_eq!(record.tokens_earned, 0);
        assert!(!record.chest_granted);
        assert_eq!(record.last_play_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn account_without_name_becomes_empty_handle_parts() {
        let dto: AccountDto = serde_json::from_str(r#"{"puuid":"p9"}"#).unwrap();
        let identity = dto.into_identity(Region::Kr);
        assert_eq!(identity.game_name, "");
        assert_eq!(identity.region, Region::Kr);
    }
}
