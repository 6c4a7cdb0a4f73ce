//! Job types exchanged between the pipeline, the dispatcher and the workers.

use crate::data::models::PlayerIdentity;
use crate::error::SyncError;
use crate::riot::Region;
use crate::sync::identity::Handle;
use crate::sync::upsert::MasteryReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

pub type JobId = Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Metadata,
    Matches,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::Metadata, JobKind::Matches];

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Metadata => "metadata",
            JobKind::Matches => "matches",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority. Lower values are claimed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub u8);

impl Priority {
    pub const HIGH: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(5);
    pub const LOW: Priority = Priority(9);
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Who a job is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Handle(Handle),
    Puuid(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Handle(handle) => handle.fmt(f),
            Subject::Puuid(puuid) => write!(f, "puuid:{puuid}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncJob {
    pub id: JobId,
    pub kind: JobKind,
    pub subject: Subject,
    pub region: Region,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// What a successful job produced.
#[derive(Debug, Clone)]
pub enum JobSummary {
    Metadata {
        identity: PlayerIdentity,
        masteries: MasteryReport,
    },
    Matches(MatchPageReport),
}

/// Tally of one match job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchPageReport {
    pub listed: usize,
    pub already_stored: usize,
    pub ingested: usize,
    pub failed: usize,
    pub participants_resolved: usize,
    pub participants_failed: usize,
}

impl MatchPageReport {
    /// Ids that were not already stored when the job looked at them.
    pub fn attempted(&self) -> usize {
        self.listed - self.already_stored
    }
}

/// Terminal result as seen by a waiter.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Completed(JobSummary),
    Failed(Arc<SyncError>),
    TimedOut,
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Completed(_) => JobState::Completed,
            JobOutcome::Failed(_) => JobState::Failed,
            JobOutcome::TimedOut => JobState::TimedOut,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }
}

impl From<Result<JobSummary, SyncError>> for JobOutcome {
    fn from(result: Result<JobSummary, SyncError>) -> Self {
        match result {
            Ok(summary) => JobOutcome::Completed(summary),
            Err(e) => JobOutcome::Failed(Arc::new(e)),
        }
    }
}
