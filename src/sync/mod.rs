//! The sync pipeline: jobs, the dispatcher and the workers that run them.

pub mod dispatcher;
pub mod identity;
pub mod jobs;
pub mod upsert;
pub mod worker;

use crate::error::SyncError;
use crate::riot::Region;
use crate::sync::dispatcher::SyncJobDispatcher;
use crate::sync::identity::Handle;
use crate::sync::jobs::{JobKind, JobOutcome, JobSummary, Priority, Subject};
use crate::sync::worker::{JobRunner, Worker};
use crate::utils::fmt_duration;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use identity::IdentityResolver;
pub use upsert::EntityUpserter;
pub use worker::JobSettings;

/// Pool sizes and wait limits of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub metadata_workers: usize,
    pub match_workers: usize,
    pub metadata_timeout: Duration,
    pub matches_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            metadata_workers: 2,
            match_workers: 1,
            metadata_timeout: Duration::from_secs(20),
            matches_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub metadata_ok: bool,
    pub matches_ok: bool,
    /// Set once the metadata stage completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub puuid: Option<String>,
}

/// Owns the dispatcher and the worker pool.
pub struct SyncService {
    dispatcher: Arc<SyncJobDispatcher>,
    settings: PipelineSettings,
    workers: Vec<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncService {
    /// Spawn the worker pool. Must be called inside a Tokio runtime.
    pub fn start(runner: Arc<JobRunner>, settings: PipelineSettings) -> Self {
        let dispatcher = SyncJobDispatcher::new();
        let (shutdown_tx, _) = broadcast::channel(1);

        let pools = [
            (JobKind::Metadata, settings.metadata_workers.max(1)),
            (JobKind::Matches, settings.match_workers.max(1)),
        ];
        let mut workers = Vec::new();
        for (kind, count) in pools {
            for _ in 0..count {
                let worker = Worker::new(workers.len(), kind, dispatcher.clone(), runner.clone());
                let shutdown_rx = shutdown_tx.subscribe();
                workers.push(tokio::spawn(async move {
                    worker.run(shutdown_rx).await;
                }));
            }
        }

        info!(
            metadata_workers = settings.metadata_workers.max(1),
            match_workers = settings.match_workers.max(1),
            "Sync workers started"
        );

        Self {
            dispatcher,
            settings,
            workers,
            shutdown_tx,
        }
    }

    pub fn dispatcher(&self) -> &Arc<SyncJobDispatcher> {
        &self.dispatcher
    }

    /// Sync one player's metadata and, when asked, their recent matches.
    ///
    /// The match stage only starts after the metadata stage completed within
    /// its timeout. A malformed handle reports failure without enqueuing anything.
    pub async fn request_sync(
        &self,
        handle: &str,
        region: Region,
        include_matches: bool,
    ) -> SyncReport {
        let handle: Handle = match handle.parse() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Rejected sync request");
                return SyncReport::default();
            }
        };

        let mut report = SyncReport::default();
        let metadata = self.dispatcher.enqueue(
            JobKind::Metadata,
            Subject::Handle(handle.clone()),
            region,
            Priority::HIGH,
        );
        let outcome = self
            .dispatcher
            .await_completion(metadata, self.settings.metadata_timeout)
            .await;

        let puuid = match outcome {
            JobOutcome::Completed(JobSummary::Metadata { identity, .. }) => identity.puuid,
            other => {
                self.log_stage_failure(JobKind::Metadata, &handle, &other);
                return report;
            }
        };
        report.metadata_ok = true;
        report.puuid = Some(puuid.clone());

        if !include_matches {
            return report;
        }

        let matches = self.dispatcher.enqueue(
            JobKind::Matches,
            Subject::Puuid(puuid),
            region,
            Priority::HIGH,
        );
        let outcome = self
            .dispatcher
            .await_completion(matches, self.settings.matches_timeout)
            .await;
        report.matches_ok = outcome.is_completed();
        if !report.matches_ok {
            self.log_stage_failure(JobKind::Matches, &handle, &outcome);
        }

        report
    }

    fn log_stage_failure(&self, kind: JobKind, handle: &Handle, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::TimedOut => {
                let after = match kind {
                    JobKind::Metadata => self.settings.metadata_timeout,
                    JobKind::Matches => self.settings.matches_timeout,
                };
                let err = SyncError::JobTimeout { kind, after };
                warn!(%handle, %kind, error = %err, "Sync stage timed out");
            }
            JobOutcome::Failed(e) => warn!(%handle, %kind, error = %e, "Sync stage failed"),
            JobOutcome::Completed(summary) => {
                warn!(%handle, %kind, ?summary, "Sync stage returned an unexpected summary")
            }
        }
    }

    /// Stop idle workers and give running jobs up to `timeout` to finish.
    pub async fn shutdown(self, timeout: Duration) {
        let _ = self.shutdown_tx.send(());
        self.dispatcher.close();

        let snapshot = self.dispatcher.snapshot();
        info!(
            running_metadata = snapshot.metadata.running,
            running_matches = snapshot.matches.running,
            timeout = fmt_duration(timeout),
            "Waiting for sync workers"
        );

        let aborts: Vec<_> = self.workers.iter().map(|w| w.abort_handle()).collect();
        let joined = futures::future::join_all(self.workers);
        if tokio::time::timeout(timeout, joined).await.is_err() {
            warn!("Sync workers did not stop in time, abandoning in-flight jobs");
            for handle in aborts {
                handle.abort();
            }
        } else {
            info!("Sync workers stopped");
        }
    }
}
