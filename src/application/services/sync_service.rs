use crate::application::ports::{RemoteError, RemoteTables, SyncQueue};
use crate::domain::value_objects::{MutationAction, MutationId};
use crate::infrastructure::offline::{DrainMetrics, DrainMetricsSnapshot, DrainOutcomeStatus};
use crate::shared::error::AppError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Why a drain batch stopped before the end of its snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    Remote(RemoteError),
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainHalt {
    /// First record left in the queue.
    pub mutation_id: MutationId,
    pub reason: HaltReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub applied: usize,
    pub remaining: u64,
    pub halted: Option<DrainHalt>,
    pub duration: Duration,
}

impl DrainReport {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

/// Result of asking for a drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    AlreadyRunning,
    Offline,
    QueueEmpty,
    Drained(DrainReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub pending: u64,
    pub last_sync: Option<i64>,
    pub sync_errors: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct SyncState {
    is_syncing: bool,
    last_sync: Option<i64>,
    sync_errors: u32,
    last_error: Option<String>,
}

/// Replays queued mutations against the remote store, oldest first.
///
/// At most one drain runs at a time. A batch stops at the first failing
/// record and leaves it, and everything after it, in the queue. Mutations
/// queued while a drain runs are picked up by that same drain.
pub struct SyncService {
    queue: Arc<dyn SyncQueue>,
    remote: Arc<RemoteTables>,
    drain_budget: Duration,
    gate: Mutex<()>,
    /// Set by every trigger before it tries the gate; the drain holding the
    /// gate re-checks the queue when it finds this set on release.
    rerun: AtomicBool,
    state: RwLock<SyncState>,
    metrics: DrainMetrics,
    reports: broadcast::Sender<DrainReport>,
}

struct ReplayPass {
    attempted: usize,
    applied: usize,
    halted: Option<DrainHalt>,
}

impl SyncService {
    pub fn new(
        queue: Arc<dyn SyncQueue>,
        remote: Arc<RemoteTables>,
        drain_budget: Duration,
    ) -> Self {
        let (reports, _rx) = broadcast::channel(16);
        Self {
            queue,
            remote,
            drain_budget,
            gate: Mutex::new(()),
            rerun: AtomicBool::new(false),
            state: RwLock::new(SyncState::default()),
            metrics: DrainMetrics::new(),
            reports,
        }
    }

    pub async fn is_syncing(&self) -> bool {
        self.state.read().await.is_syncing
    }

    /// Receives a report after every drain that processed a batch.
    pub fn subscribe(&self) -> broadcast::Receiver<DrainReport> {
        self.reports.subscribe()
    }

    pub fn metrics(&self) -> DrainMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn status(&self) -> Result<SyncStatus, AppError> {
        let pending = self.queue.count().await?;
        let state = self.state.read().await.clone();
        Ok(SyncStatus {
            is_syncing: state.is_syncing,
            pending,
            last_sync: state.last_sync,
            sync_errors: state.sync_errors,
            last_error: state.last_error,
        })
    }

    /// Drains the queue unless a drain is already running or nothing is
    /// pending. Remote failures are reported in the outcome; only local
    /// persistence failures are returned as errors.
    pub async fn drain_pending(&self) -> Result<TriggerOutcome, AppError> {
        let mut combined: Option<DrainReport> = None;
        let mut busy = false;

        loop {
            self.rerun.store(true, Ordering::SeqCst);
            let Ok(gate) = self.gate.try_lock() else {
                busy = true;
                break;
            };
            self.rerun.store(false, Ordering::SeqCst);

            let result = self.drain_locked().await;
            drop(gate);

            let Some(report) = result? else {
                break;
            };
            let complete = report.is_complete();
            combined = Some(match combined {
                Some(previous) => merge_reports(previous, report),
                None => report,
            });
            if !complete || !self.rerun.load(Ordering::SeqCst) {
                break;
            }
            debug!("Sync requested during drain, checking queue again");
        }

        match combined {
            Some(report) => {
                let _ = self.reports.send(report.clone());
                Ok(TriggerOutcome::Drained(report))
            }
            None if busy => {
                info!("Sync already in progress, skipping");
                Ok(TriggerOutcome::AlreadyRunning)
            }
            None => Ok(TriggerOutcome::QueueEmpty),
        }
    }

    /// Runs one drain while holding the gate. `None` when nothing is queued.
    async fn drain_locked(&self) -> Result<Option<DrainReport>, AppError> {
        let pending = self.queue.count().await?;
        if pending == 0 {
            return Ok(None);
        }

        info!(pending, "Starting sync of pending mutations");
        self.state.write().await.is_syncing = true;
        let started = Instant::now();
        let result = self.replay_until_settled(started).await;

        let mut state = self.state.write().await;
        state.is_syncing = false;
        match &result {
            Ok(report) if report.is_complete() => {
                state.last_sync = Some(chrono::Utc::now().timestamp());
                state.last_error = None;
            }
            Ok(report) => {
                state.sync_errors += 1;
                state.last_error = report.halted.as_ref().map(describe_halt);
            }
            Err(err) => {
                state.sync_errors += 1;
                state.last_error = Some(err.to_string());
            }
        }
        drop(state);

        match &result {
            Ok(report) => {
                let error = report.halted.as_ref().map(describe_halt);
                self.record_metrics(report.applied, started, error).await;
                if report.is_complete() {
                    info!(applied = report.applied, "Sync completed successfully");
                }
            }
            Err(err) => {
                self.record_metrics(0, started, Some(err.to_string()))
                    .await;
            }
        }
        result.map(Some)
    }

    /// Replays snapshots until the queue is empty, a record fails, or the
    /// budget runs out.
    async fn replay_until_settled(&self, started: Instant) -> Result<DrainReport, AppError> {
        let mut report = DrainReport {
            attempted: 0,
            applied: 0,
            remaining: 0,
            halted: None,
            duration: Duration::ZERO,
        };

        loop {
            let pass = self.replay(started).await?;
            report.attempted += pass.attempted;
            report.applied += pass.applied;
            report.halted = pass.halted;
            report.remaining = self.queue.count().await?;

            if report.halted.is_some() || report.remaining == 0 || pass.attempted == 0 {
                break;
            }
            debug!(
                remaining = report.remaining,
                "Mutations queued during drain, continuing"
            );
        }

        report.duration = started.elapsed();
        Ok(report)
    }

    async fn replay(&self, started: Instant) -> Result<ReplayPass, AppError> {
        let snapshot = self.queue.peek_all().await?;
        let mut pass = ReplayPass {
            attempted: 0,
            applied: 0,
            halted: None,
        };

        for record in snapshot {
            let budget_left = self
                .drain_budget
                .checked_sub(started.elapsed())
                .filter(|left| !left.is_zero());
            let Some(budget_left) = budget_left else {
                pass.halted = Some(DrainHalt {
                    mutation_id: record.id,
                    reason: HaltReason::BudgetExhausted,
                });
                break;
            };

            pass.attempted += 1;
            let call = self.remote.apply(
                &record.table,
                record.action,
                &record.record_key,
                record.payload.as_json(),
            );
            let outcome = match tokio::time::timeout(budget_left, call).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(err)) if already_applied(record.action, &err) => {
                    info!(
                        mutation_id = %record.id,
                        table = %record.table,
                        action = %record.action,
                        error = %err,
                        "Mutation already applied remotely"
                    );
                    Ok(())
                }
                Ok(Err(err)) => Err(HaltReason::Remote(err)),
                Err(_) => Err(HaltReason::BudgetExhausted),
            };

            match outcome {
                Ok(()) => {
                    if let Err(err) = self.queue.dequeue(record.id).await {
                        error!(
                            mutation_id = %record.id,
                            error = %err,
                            "Remote apply succeeded but dequeue failed"
                        );
                        return Err(err);
                    }
                    pass.applied += 1;
                }
                Err(reason) => {
                    warn!(
                        mutation_id = %record.id,
                        table = %record.table,
                        action = %record.action,
                        reason = ?reason,
                        "Sync halted; remaining mutations stay queued"
                    );
                    pass.halted = Some(DrainHalt {
                        mutation_id: record.id,
                        reason,
                    });
                    break;
                }
            }
        }

        Ok(pass)
    }

    async fn record_metrics(&self, applied: usize, started: Instant, error: Option<String>) {
        let remaining = self.queue.count().await.unwrap_or_default();
        let status = if error.is_none() {
            DrainOutcomeStatus::Success
        } else {
            DrainOutcomeStatus::Failure
        };
        self.metrics.record_batch(
            status,
            applied as u64,
            remaining,
            started.elapsed().as_millis() as u64,
            error,
        );
    }
}

/// A replayed mutation whose effect the remote already holds: the create
/// committed before its reply was lost, or the row is already gone.
fn already_applied(action: MutationAction, err: &RemoteError) -> bool {
    matches!(
        (action, err),
        (MutationAction::Create, RemoteError::Rejected { status: 409, .. })
            | (MutationAction::Delete, RemoteError::NotFound(_))
    )
}

fn merge_reports(previous: DrainReport, next: DrainReport) -> DrainReport {
    DrainReport {
        attempted: previous.attempted + next.attempted,
        applied: previous.applied + next.applied,
        remaining: next.remaining,
        halted: next.halted,
        duration: previous.duration + next.duration,
    }
}

fn describe_halt(halt: &DrainHalt) -> String {
    match &halt.reason {
        HaltReason::Remote(err) => format!("mutation {}: {err}", halt.mutation_id),
        HaltReason::BudgetExhausted => {
            format!("drain budget exhausted at mutation {}", halt.mutation_id)
        }
    }
}
