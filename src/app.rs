use crate::config::Config;
use crate::data::{MemoryStore, PgStore, Store};
use crate::riot::{RateLimitedCaller, Region, RiotApi, RiotClient};
use crate::sync::worker::JobRunner;
use crate::sync::{EntityUpserter, IdentityResolver, SyncReport, SyncService};
use crate::utils::fmt_duration;
use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    sync: SyncService,
}

impl App {
    /// Connect the store, build the Riot client and start the worker pool.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => {
                let pool = connect(url).await?;
                run_migrations(&pool).await?;
                Arc::new(PgStore::new(pool))
            }
            None => {
                warn!("DATABASE_URL not set, using the in-memory store; nothing will be persisted");
                Arc::new(MemoryStore::new())
            }
        };

        let api: Arc<dyn RiotApi> = Arc::new(
            RiotClient::new(config.riot_api_key.clone(), config.riot_base_url.as_deref())
                .context("Failed to create Riot API client")?,
        );

        Ok(Self::with_parts(config, api, store))
    }

    /// Assemble the pipeline from already constructed seams.
    pub fn with_parts(config: Config, api: Arc<dyn RiotApi>, store: Arc<dyn Store>) -> Self {
        let resolver = IdentityResolver::new(api, RateLimitedCaller::default());
        let upserter = EntityUpserter::new(store, resolver.clone());
        let runner = Arc::new(JobRunner::new(resolver, upserter, config.job_settings()));
        let sync = SyncService::start(runner, config.pipeline_settings());

        Self { config, sync }
    }

    pub async fn sync(&self, handle: &str, region: Region, include_matches: bool) -> SyncReport {
        self.sync.request_sync(handle, region, include_matches).await
    }

    /// Stop the worker pool, waiting up to the configured shutdown timeout.
    pub async fn shutdown(self) {
        self.sync.shutdown(self.config.shutdown_timeout).await;
    }

    /// Apply migrations against `DATABASE_URL` without starting any workers.
    pub async fn migrate(config: &Config) -> Result<(), anyhow::Error> {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL is required to run migrations")?;
        let pool = connect(url).await?;
        run_migrations(&pool).await
    }
}

async fn connect(database_url: &str) -> Result<PgPool, anyhow::Error> {
    let slow_threshold = Duration::from_millis(500);
    let connect_options = PgConnectOptions::from_str(database_url)
        .context("Failed to parse database URL")?
        .log_statements(tracing::log::LevelFilter::Debug)
        .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

    let pool = PgPoolOptions::new()
        .min_connections(0)
        .max_connections(4)
        .acquire_slow_threshold(slow_threshold)
        .acquire_timeout(Duration::from_secs(4))
        .idle_timeout(Duration::from_secs(60 * 2))
        .max_lifetime(Duration::from_secs(60 * 30))
        .connect_with(connect_options)
        .await
        .context("Failed to create database pool")?;

    info!(
        min_connections = 0,
        max_connections = 4,
        acquire_timeout = "4s",
        idle_timeout = "2m",
        max_lifetime = "30m",
        acquire_slow_threshold = fmt_duration(slow_threshold),
        "database pool established"
    );
    Ok(pool)
}

async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed successfully");
    Ok(())
}
