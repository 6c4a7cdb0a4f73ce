//! Postgres-backed [`Store`].

use super::models::{MasteryRecord, MatchRecord, PlayerIdentity, PlayerProfile};
use super::store::Store;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

const PROFILE_COLUMNS: &str =
    "puuid, profile_icon_id, summoner_level, revision_date, region, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_profile(&self, puuid: &str) -> Result<Option<PlayerProfile>> {
        sqlx::query_as::<_, PlayerProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM player_profiles WHERE puuid = $1"
        ))
        .bind(puuid)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch player profile")
    }

    async fn insert_profile(&self, profile: &PlayerProfile) -> Result<PlayerProfile> {
        // The no-op update makes a conflicting row come back through RETURNING,
        // including one committed by a concurrent insert after this statement began.
        sqlx::query_as::<_, PlayerProfile>(&format!(
            r#"
            INSERT INTO player_profiles ({PROFILE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (puuid) DO UPDATE SET puuid = EXCLUDED.puuid
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(&profile.puuid)
        .bind(profile.profile_icon_id)
        .bind(profile.summoner_level)
        .bind(profile.revision_date)
        .bind(profile.region)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert player profile")
    }

    async fn update_profile(&self, profile: &PlayerProfile) -> Result<Option<PlayerProfile>> {
        sqlx::query_as::<_, PlayerProfile>(&format!(
            r#"
            UPDATE player_profiles SET
                profile_icon_id = $2,
                summoner_level = $3,
                revision_date = $4,
                region = $5,
                updated_at = $6
            WHERE puuid = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(&profile.puuid)
        .bind(profile.profile_icon_id)
        .bind(profile.summoner_level)
        .bind(profile.revision_date)
        .bind(profile.region)
        .bind(profile.updated_at)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update player profile")
    }

    async fn find_identity(&self, puuid: &str) -> Result<Option<PlayerIdentity>> {
        sqlx::query_as::<_, PlayerIdentity>(
            "SELECT puuid, game_name, tag_line, region FROM players WHERE puuid = $1",
        )
        .bind(puuid)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch player identity")
    }

    async fn upsert_identity(&self, identity: &PlayerIdentity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO players (puuid, game_name, tag_line, region, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (puuid)
            DO UPDATE SET
                game_name = EXCLUDED.game_name,
                tag_line = EXCLUDED.tag_line,
                region = EXCLUDED.region,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&identity.puuid)
        .bind(&identity.game_name)
        .bind(&identity.tag_line)
        .bind(identity.region)
        .execute(&self.pool)
        .await
        .context("Failed to upsert player identity")?;
        Ok(())
    }

    async fn upsert_mastery(&self, record: &MasteryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO champion_masteries (
                puuid, champion_id, champion_level, champion_points,
                last_play_time, tokens_earned, chest_granted, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (puuid, champion_id)
            DO UPDATE SET
                champion_level = EXCLUDED.champion_level,
                champion_points = EXCLUDED.champion_points,
                last_play_time = EXCLUDED.last_play_time,
                tokens_earned = EXCLUDED.tokens_earned,
                chest_granted = EXCLUDED.chest_granted,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.puuid)
        .bind(record.champion_id)
        .bind(record.champion_level)
        .bind(record.champion_points)
        .bind(record.last_play_time)
        .bind(record.tokens_earned)
        .bind(record.chest_granted)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert mastery for champion {}", record.champion_id))?;
        Ok(())
    }

    async fn insert_match(&self, record: &MatchRecord) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO matches (
                match_id, region, game_creation, game_duration_secs,
                game_mode, queue_id, game_version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (match_id) DO NOTHING
            "#,
        )
        .bind(&record.match_id)
        .bind(record.region)
        .bind(record.game_creation)
        .bind(record.game_duration_secs)
        .bind(&record.game_mode)
        .bind(record.queue_id)
        .bind(&record.game_version)
        .execute(&mut *tx)
        .await
        .context("Failed to insert match")?
        .rows_affected()
            > 0;

        if !inserted {
            tx.rollback().await?;
            return Ok(false);
        }

        let puuids: Vec<&str> = record.participants.iter().map(|p| p.puuid.as_str()).collect();
        let champion_ids: Vec<i64> = record.participants.iter().map(|p| p.champion_id).collect();
        let team_ids: Vec<i32> = record.participants.iter().map(|p| p.team_id).collect();
        let wins: Vec<bool> = record.participants.iter().map(|p| p.win).collect();
        let kills: Vec<i32> = record.participants.iter().map(|p| p.kills).collect();
        let deaths: Vec<i32> = record.participants.iter().map(|p| p.deaths).collect();
        let assists: Vec<i32> = record.participants.iter().map(|p| p.assists).collect();

        sqlx::query(
            r#"
            INSERT INTO match_participants (
                match_id, puuid, champion_id, team_id, win, kills, deaths, assists
            )
            SELECT $1, v.puuid, v.champion_id, v.team_id, v.win, v.kills, v.deaths, v.assists
            FROM UNNEST(
                $2::text[], $3::int8[], $4::int4[], $5::bool[], $6::int4[], $7::int4[], $8::int4[]
            ) AS v(puuid, champion_id, team_id, win, kills, deaths, assists)
            ON CONFLICT (match_id, puuid) DO NOTHING
            "#,
        )
        .bind(&record.match_id)
        .bind(&puuids)
        .bind(&champion_ids)
        .bind(&team_ids)
        .bind(&wins)
        .bind(&kills)
        .bind(&deaths)
        .bind(&assists)
        .execute(&mut *tx)
        .await
        .context("Failed to insert match participants")?;

        tx.commit().await?;
        Ok(true)
    }

    async fn match_exists(&self, match_id: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM matches WHERE match_id = $1)")
                .bind(match_id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to check match existence")?;
        Ok(exists)
    }
}
