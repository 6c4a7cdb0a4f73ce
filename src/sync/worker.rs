use crate::error::SyncError;
use crate::sync::dispatcher::SyncJobDispatcher;
use crate::sync::identity::IdentityResolver;
use crate::sync::jobs::{JobKind, JobOutcome, JobSummary, MatchPageReport, Subject, SyncJob};
use crate::sync::upsert::{EntityUpserter, MatchIngest};
use crate::utils::fmt_duration;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{Instrument, debug, error, info, warn};

/// Jobs running longer than this are logged as slow.
const SLOW_THRESHOLD: Duration = Duration::from_secs(30);

/// Per-job knobs taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct JobSettings {
    pub match_page_size: u32,
    pub refresh_existing_profiles: bool,
}

/// Executes metadata and match jobs. Shared by every worker.
pub struct JobRunner {
    resolver: IdentityResolver,
    upserter: EntityUpserter,
    settings: JobSettings,
}

impl JobRunner {
    pub fn new(resolver: IdentityResolver, upserter: EntityUpserter, settings: JobSettings) -> Self {
        Self {
            resolver,
            upserter,
            settings,
        }
    }

    pub async fn run(&self, job: &SyncJob) -> Result<JobSummary, SyncError> {
        match job.kind {
            JobKind::Metadata => self.run_metadata(job).await,
            JobKind::Matches => self.run_matches(job).await,
        }
    }

    /// Resolve and fetch everything first; writes only start once every call succeeded.
    async fn run_metadata(&self, job: &SyncJob) -> Result<JobSummary, SyncError> {
        let (identity, profile) = match &job.subject {
            Subject::Handle(handle) => {
                let identity = self
                    .resolver
                    .resolve_by_riot_id(&handle.game_name, &handle.tag_line, job.region)
                    .await?;
                let profile = self
                    .resolver
                    .fetch_profile(&identity.puuid, job.region)
                    .await?;
                (identity, profile)
            }
            Subject::Puuid(puuid) => self.resolver.resolve_by_id(puuid, job.region).await?,
        };
        let masteries = self
            .resolver
            .fetch_masteries(&identity.puuid, job.region)
            .await?;

        self.upserter.upsert_identity(&identity).await?;
        self.upserter
            .sync_profile(&profile, self.settings.refresh_existing_profiles)
            .await?;

        let report = self
            .upserter
            .upsert_masteries(&identity.puuid, &masteries)
            .await;
        if !report.is_clean() {
            warn!(
                puuid = %identity.puuid,
                applied = report.applied,
                failed = report.failed.len(),
                "Some mastery records were not stored"
            );
        }

        Ok(JobSummary::Metadata {
            identity,
            masteries: report,
        })
    }

    /// Fails only when every match that was not already stored failed.
    async fn run_matches(&self, job: &SyncJob) -> Result<JobSummary, SyncError> {
        let puuid = match &job.subject {
            Subject::Puuid(puuid) => puuid.clone(),
            Subject::Handle(handle) => {
                self.resolver
                    .resolve_by_riot_id(&handle.game_name, &handle.tag_line, job.region)
                    .await?
                    .puuid
            }
        };

        let ids = self
            .resolver
            .fetch_recent_match_ids(&puuid, job.region, self.settings.match_page_size)
            .await?;

        let mut report = MatchPageReport {
            listed: ids.len(),
            ..MatchPageReport::default()
        };
        let mut last_error = None;

        for match_id in &ids {
            match self.ingest_match(job, match_id).await {
                Ok(MatchIngest::AlreadyPresent) => report.already_stored += 1,
                Ok(MatchIngest::Inserted {
                    participants_resolved,
                    participants_failed,
                }) => {
                    report.ingested += 1;
                    report.participants_resolved += participants_resolved;
                    report.participants_failed += participants_failed;
                }
                Err(e) => {
                    warn!(match_id, error = %e, "Skipping match");
                    report.failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if report.attempted() > 0 && report.failed == report.attempted() {
            return Err(last_error.unwrap_or_else(|| {
                SyncError::upstream(format!("all {} matches failed", report.failed))
            }));
        }

        Ok(JobSummary::Matches(report))
    }

    async fn ingest_match(&self, job: &SyncJob, match_id: &str) -> Result<MatchIngest, SyncError> {
        if self.upserter.match_exists(match_id).await? {
            return Ok(MatchIngest::AlreadyPresent);
        }
        let record = self
            .resolver
            .fetch_match(match_id)
            .await?
            .into_record(job.region);
        self.upserter.upsert_match(&record).await
    }
}

/// A single worker instance.
///
/// Each worker claims jobs of one kind from the dispatcher and runs them to
/// completion, one at a time.
pub struct Worker {
    id: usize,
    kind: JobKind,
    dispatcher: Arc<SyncJobDispatcher>,
    runner: Arc<JobRunner>,
}

impl Worker {
    pub fn new(
        id: usize,
        kind: JobKind,
        dispatcher: Arc<SyncJobDispatcher>,
        runner: Arc<JobRunner>,
    ) -> Self {
        Self {
            id,
            kind,
            dispatcher,
            runner,
        }
    }

    /// Runs the worker's main loop. A job that has started is never interrupted
    /// by shutdown; the signal is only observed between jobs.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(worker_id = self.id, kind = %self.kind, "Worker started");

        loop {
            let job = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(worker_id = self.id, kind = %self.kind, "Worker received shutdown signal, exiting gracefully");
                    break;
                }
                job = self.dispatcher.claim(self.kind) => match job {
                    Some(job) => job,
                    None => {
                        debug!(worker_id = self.id, kind = %self.kind, "Dispatcher closed, exiting");
                        break;
                    }
                }
            };

            let span = tracing::info_span!(
                "sync_job",
                job_id = %job.id,
                kind = %job.kind,
                subject = %job.subject,
                region = %job.region
            );
            let start = Instant::now();
            let result = async {
                debug!(worker_id = self.id, "Processing job");
                self.runner.run(&job).await
            }
            .instrument(span.clone())
            .await;

            span.in_scope(|| self.handle_job_result(&job, result, start.elapsed()));
        }
    }

    fn handle_job_result(
        &self,
        job: &SyncJob,
        result: Result<JobSummary, SyncError>,
        duration: Duration,
    ) {
        if duration > SLOW_THRESHOLD {
            warn!(
                worker_id = self.id,
                duration = fmt_duration(duration),
                "Slow job processing detected (likely rate limiting or network delays)"
            );
        }

        match &result {
            Ok(JobSummary::Metadata { identity, masteries }) => info!(
                worker_id = self.id,
                duration = fmt_duration(duration),
                puuid = %identity.puuid,
                masteries = masteries.applied,
                "Metadata job completed"
            ),
            Ok(JobSummary::Matches(report)) => info!(
                worker_id = self.id,
                duration = fmt_duration(duration),
                listed = report.listed,
                ingested = report.ingested,
                already_stored = report.already_stored,
                failed = report.failed,
                participants_resolved = report.participants_resolved,
                "Match job completed"
            ),
            Err(e) => error!(
                worker_id = self.id,
                duration = fmt_duration(duration),
                error = %e,
                "Job failed"
            ),
        }

        self.dispatcher.complete(job.id, JobOutcome::from(result));
    }
}
