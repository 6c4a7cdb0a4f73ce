//! Configuration module for riftsync.
//!
//! Everything is read from environment variables (after `.env` is loaded).
//! Only `RIOT_API_KEY` is required.

use crate::sync::{JobSettings, PipelineSettings};
use anyhow::Context;
use figment::{Figment, providers::Env};
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Main application configuration
#[derive(Deserialize, custom_debug_derive::Debug)]
pub struct Config {
    /// Log level for riftsync's own targets (`trace`..`error`)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Postgres connection string; the in-memory store is used when unset
    #[serde(default)]
    #[debug(skip)]
    pub database_url: Option<String>,
    #[debug(skip)]
    pub riot_api_key: String,
    /// Replaces every Riot host, for local mocks
    #[serde(default)]
    pub riot_base_url: Option<String>,

    #[serde(default = "default_metadata_workers")]
    pub metadata_workers: usize,
    #[serde(default = "default_match_workers")]
    pub match_workers: usize,
    #[serde(
        default = "default_metadata_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub metadata_timeout: Duration,
    #[serde(
        default = "default_matches_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub matches_timeout: Duration,
    /// How many recent match ids a match job lists
    #[serde(default = "default_match_page_size")]
    pub match_page_size: u32,
    /// Overwrite stored profiles on re-sync instead of keeping the first row
    #[serde(default)]
    pub refresh_existing_profiles: bool,
    /// How long in-flight jobs may run after shutdown was requested
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metadata_workers() -> usize {
    2
}

fn default_match_workers() -> usize {
    1
}

fn default_metadata_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_matches_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_match_page_size() -> u32 {
    20
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(Figment::new().merge(Env::raw()))
    }

    fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment.extract().context("Failed to load config")?;
        anyhow::ensure!(
            !config.riot_api_key.trim().is_empty(),
            "RIOT_API_KEY must not be empty"
        );
        anyhow::ensure!(
            (1..=100).contains(&config.match_page_size),
            "MATCH_PAGE_SIZE must be between 1 and 100, got {}",
            config.match_page_size
        );
        Ok(config)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            metadata_workers: self.metadata_workers,
            match_workers: self.match_workers,
            metadata_timeout: self.metadata_timeout,
            matches_timeout: self.matches_timeout,
        }
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            match_page_size: self.match_page_size,
            refresh_existing_profiles: self.refresh_existing_profiles,
        }
    }
}

/// Parse a duration such as `20s`, `2m` or `1500ms`. Bare numbers are seconds.
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);

    let parsed = parser
        .parse(raw.trim())
        .map_err(|e| format!("invalid duration '{raw}': {e}"))?;
    parsed
        .try_into()
        .map_err(|e| format!("invalid duration '{raw}': {e}"))
}

/// Accepts integer seconds or a human duration string.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration like '20s', '1m' or a number of seconds")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(value)
                .map(Duration::from_secs)
                .map_err(|_| E::custom(format!("negative duration: {value}")))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            parse_duration(value).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn parses_human_durations() {
        assert_eq!(parse_duration("20s").unwrap(), Duration::from_secs(20));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("RIOT_API_KEY", "RGAPI-test");
            let config = Config::from_figment(Figment::new().merge(Env::raw()))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.metadata_timeout, Duration::from_secs(20));
            assert_eq!(config.matches_timeout, Duration::from_secs(60));
            assert_eq!(config.match_page_size, 20);
            assert_eq!(config.metadata_workers, 2);
            assert_eq!(config.match_workers, 1);
            assert!(config.database_url.is_none());
            assert!(!config.refresh_existing_profiles);
            Ok(())
        });
    }

    #[test]
    fn reads_overrides_from_env() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("RIOT_API_KEY", "RGAPI-test");
            jail.set_env("METADATA_TIMEOUT", "5s");
            jail.set_env("MATCHES_TIMEOUT", "2m");
            jail.set_env("SHUTDOWN_TIMEOUT", "3");
            jail.set_env("REFRESH_EXISTING_PROFILES", "true");
            let config = Config::from_figment(Figment::new().merge(Env::raw()))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.metadata_timeout, Duration::from_secs(5));
            assert_eq!(config.matches_timeout, Duration::from_secs(120));
            assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
            assert!(config.job_settings().refresh_existing_profiles);
            Ok(())
        });
    }

    #[test]
    fn api_key_is_required_and_redacted() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            assert!(Config::from_figment(Figment::new().merge(Env::raw())).is_err());

            jail.set_env("RIOT_API_KEY", "RGAPI-secret");
            let config = Config::from_figment(Figment::new().merge(Env::raw()))
                .map_err(|e| e.to_string())?;
            assert!(!format!("{config:?}").contains("RGAPI-secret"));
            Ok(())
        });
    }
}
