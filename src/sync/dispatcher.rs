//! In-process job queue with per-kind priority ordering and bounded waits.

use crate::error::SyncError;
use crate::riot::Region;
use crate::sync::jobs::{JobId, JobKind, JobOutcome, JobState, Priority, Subject, SyncJob};
use crate::utils::fmt_duration;
use chrono::Utc;
use dashmap::DashMap;
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, trace, warn};
use ulid::Ulid;

/// Heap entry ordered by `(priority, seq)`.
struct Queued {
    priority: Priority,
    seq: u64,
    job: SyncJob,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.priority, self.seq).cmp(&(other.priority, other.seq))
    }
}

#[derive(Default)]
struct KindQueue {
    heap: Mutex<BinaryHeap<Reverse<Queued>>>,
    notify: Notify,
    enqueued: AtomicU64,
}

struct JobEntry {
    kind: JobKind,
    state: JobState,
    waiter: Option<oneshot::Sender<JobOutcome>>,
}

/// Returned by [`SyncJobDispatcher::enqueue`]; redeem it with
/// [`SyncJobDispatcher::await_completion`].
#[derive(Debug)]
pub struct JobHandle {
    pub id: JobId,
    pub kind: JobKind,
    rx: oneshot::Receiver<JobOutcome>,
}

/// Point-in-time queue counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub pending: usize,
    pub running: usize,
    /// Jobs of this kind enqueued since startup.
    pub enqueued: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherSnapshot {
    pub metadata: KindStats,
    pub matches: KindStats,
}

impl DispatcherSnapshot {
    pub fn get(&self, kind: JobKind) -> KindStats {
        match kind {
            JobKind::Metadata => self.metadata,
            JobKind::Matches => self.matches,
        }
    }
}

/// Hands jobs to workers and outcomes back to waiters.
///
/// Each kind has its own queue; workers claim the lowest priority number
/// first and ties go to the earliest enqueue. A job resolves exactly once:
/// either a worker reports it or its waiter gives up, whichever comes first.
#[derive(Default)]
pub struct SyncJobDispatcher {
    metadata: KindQueue,
    matches: KindQueue,
    jobs: DashMap<JobId, JobEntry>,
    seq: AtomicU64,
    closed: AtomicBool,
}

impl SyncJobDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn queue(&self, kind: JobKind) -> &KindQueue {
        match kind {
            JobKind::Metadata => &self.metadata,
            JobKind::Matches => &self.matches,
        }
    }

    pub fn enqueue(
        &self,
        kind: JobKind,
        subject: Subject,
        region: Region,
        priority: Priority,
    ) -> JobHandle {
        let (tx, rx) = oneshot::channel();
        let job = SyncJob {
            id: Ulid::new(),
            kind,
            subject,
            region,
            priority,
            enqueued_at: Utc::now(),
        };
        let id = job.id;

        self.jobs.insert(
            id,
            JobEntry {
                kind,
                state: JobState::Pending,
                waiter: Some(tx),
            },
        );

        let queue = self.queue(kind);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        debug!(job_id = %id, %kind, subject = %job.subject, priority = priority.0, "Job enqueued");
        lock_heap(&queue.heap).push(Reverse(Queued { priority, seq, job }));
        queue.enqueued.fetch_add(1, Ordering::Relaxed);
        queue.notify.notify_one();

        JobHandle { id, kind, rx }
    }

    /// Wait for the next job of `kind`. Returns `None` once the dispatcher is closed.
    pub async fn claim(&self, kind: JobKind) -> Option<SyncJob> {
        let queue = self.queue(kind);
        loop {
            let notified = queue.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.closed.load(Ordering::Acquire) {
                return None;
            }

            let next = lock_heap(&queue.heap).pop();
            if let Some(Reverse(Queued { job, .. })) = next {
                match self.jobs.get_mut(&job.id) {
                    Some(mut entry) => entry.state = JobState::Running,
                    None => trace!(job_id = %job.id, "Claimed a job whose waiter already left"),
                }
                return Some(job);
            }

            notified.await;
        }
    }

    /// Report a worker's result. Returns `false` when the waiter had already
    /// resolved the job, in which case the outcome is dropped.
    pub fn complete(&self, id: JobId, outcome: JobOutcome) -> bool {
        let Some((_, entry)) = self.jobs.remove(&id) else {
            debug!(job_id = %id, state = ?outcome.state(), "Late job result dropped");
            return false;
        };
        if let Some(waiter) = entry.waiter {
            // The receiver only goes away with its handle; nothing to notify then.
            let _ = waiter.send(outcome);
        }
        true
    }

    /// Wait for the job to resolve, giving up after `timeout`.
    ///
    /// Giving up resolves the job as [`JobOutcome::TimedOut`] unless a worker
    /// got there first. The worker keeps running either way.
    pub async fn await_completion(&self, handle: JobHandle, timeout: Duration) -> JobOutcome {
        let JobHandle { id, kind, mut rx } = handle;
        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                self.jobs.remove(&id);
                JobOutcome::Failed(Arc::new(SyncError::upstream(format!(
                    "{kind} job {id} was dropped without an outcome"
                ))))
            }
            Err(_) => {
                if self.jobs.remove(&id).is_some() {
                    warn!(job_id = %id, %kind, timeout = fmt_duration(timeout), "Gave up waiting for job");
                    return JobOutcome::TimedOut;
                }
                // A worker removed the entry first and is handing over its outcome.
                rx.await.unwrap_or(JobOutcome::TimedOut)
            }
        }
    }

    pub fn snapshot(&self) -> DispatcherSnapshot {
        let mut snapshot = DispatcherSnapshot::default();
        for kind in JobKind::ALL {
            let queue = self.queue(kind);
            let stats = KindStats {
                pending: lock_heap(&queue.heap).len(),
                running: self
                    .jobs
                    .iter()
                    .filter(|e| e.kind == kind && e.state == JobState::Running)
                    .count(),
                enqueued: queue.enqueued.load(Ordering::Relaxed),
            };
            match kind {
                JobKind::Metadata => snapshot.metadata = stats,
                JobKind::Matches => snapshot.matches = stats,
            }
        }
        snapshot
    }

    /// Wake every idle worker so it can observe shutdown. Pending jobs stay
    /// queued and their waiters time out.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.metadata.notify.notify_waiters();
        self.matches.notify.notify_waiters();
    }
}

/// A panic while holding the lock cannot leave the heap half-updated, so a
/// poisoned lock is still usable.
fn lock_heap(
    heap: &Mutex<BinaryHeap<Reverse<Queued>>>,
) -> std::sync::MutexGuard<'_, BinaryHeap<Reverse<Queued>>> {
    heap.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::jobs::{JobSummary, MatchPageReport};

    fn puuid(s: &str) -> Subject {
        Subject::Puuid(s.to_owned())
    }

    fn done() -> JobOutcome {
        JobOutcome::Completed(JobSummary::Matches(MatchPageReport::default()))
    }

    #[tokio::test]
    async fn claims_by_priority_then_fifo() {
        let dispatcher = SyncJobDispatcher::new();
        let low = dispatcher.enqueue(JobKind::Metadata, puuid("low"), Region::Euw1, Priority::LOW);
        let first = dispatcher.enqueue(JobKind::Metadata, puuid("a"), Region::Euw1, Priority::NORMAL);
        let second = dispatcher.enqueue(JobKind::Metadata, puuid("b"), Region::Euw1, Priority::NORMAL);
        let urgent = dispatcher.enqueue(JobKind::Metadata, puuid("hi"), Region::Euw1, Priority::HIGH);

        let mut order = Vec::new();
        for _ in 0..4 {
            order.push(dispatcher.claim(JobKind::Metadata).await.unwrap().id);
        }
        assert_eq!(order, vec![urgent.id, first.id, second.id, low.id]);
    }

    #[tokio::test]
    async fn kinds_do_not_share_a_queue() {
        let dispatcher = SyncJobDispatcher::new();
        let handle = dispatcher.enqueue(JobKind::Matches, puuid("p"), Region::Kr, Priority::NORMAL);

        assert_eq!(dispatcher.snapshot().metadata.pending, 0);
        assert_eq!(dispatcher.snapshot().matches.pending, 1);

        let job = dispatcher.claim(JobKind::Matches).await.unwrap();
        assert_eq!(job.id, handle.id);
        assert_eq!(dispatcher.snapshot().matches.running, 1);
    }

    #[tokio::test]
    async fn waiter_receives_worker_outcome() {
        let dispatcher = SyncJobDispatcher::new();
        let handle = dispatcher.enqueue(JobKind::Matches, puuid("p"), Region::Na1, Priority::HIGH);

        let worker = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let job = dispatcher.claim(JobKind::Matches).await.unwrap();
                dispatcher.complete(job.id, done())
            })
        };

        let outcome = dispatcher
            .await_completion(handle, Duration::from_secs(5))
            .await;
        assert!(outcome.is_completed());
        assert!(worker.await.unwrap());
        assert_eq!(dispatcher.snapshot().matches.running, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_wins_over_late_worker() {
        let dispatcher = SyncJobDispatcher::new();
        let handle = dispatcher.enqueue(JobKind::Metadata, puuid("p"), Region::Na1, Priority::HIGH);
        let job = dispatcher.claim(JobKind::Metadata).await.unwrap();

        let outcome = dispatcher
            .await_completion(handle, Duration::from_secs(20))
            .await;
        assert_eq!(outcome.state(), JobState::TimedOut);

        // The late report does not change what the waiter saw
        assert!(!dispatcher.complete(job.id, done()));
    }

    #[tokio::test]
    async fn close_releases_idle_claims() {
        let dispatcher = SyncJobDispatcher::new();
        let idle = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.claim(JobKind::Metadata).await })
        };
        tokio::task::yield_now().await;

        dispatcher.close();
        assert!(idle.await.unwrap().is_none());
    }
}
