use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcomeStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrainMetricsSnapshot {
    pub total_applied: u64,
    pub total_batches: u64,
    pub failed_batches: u64,
    pub consecutive_failures: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_outcome: Option<DrainOutcomeStatus>,
    pub last_applied: Option<u64>,
    pub last_remaining: Option<u64>,
    pub last_duration_ms: Option<u64>,
    pub last_error: Option<String>,
}

#[derive(Default, Clone)]
struct LastBatch {
    outcome: Option<DrainOutcomeStatus>,
    applied: Option<u64>,
    remaining: Option<u64>,
    duration_ms: Option<u64>,
    error: Option<String>,
}

/// Counters for queue drains, owned by the sync service.
pub struct DrainMetrics {
    applied: AtomicU64,
    batches: AtomicU64,
    failed_batches: AtomicU64,
    consecutive_failures: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    last_batch: Mutex<LastBatch>,
}

impl DrainMetrics {
    pub fn new() -> Self {
        Self {
            applied: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            failed_batches: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            last_batch: Mutex::new(LastBatch::default()),
        }
    }

    pub fn record_batch(
        &self,
        status: DrainOutcomeStatus,
        applied: u64,
        remaining: u64,
        duration_ms: u64,
        error: Option<String>,
    ) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.applied.fetch_add(applied, Ordering::Relaxed);
        match status {
            DrainOutcomeStatus::Success => {
                self.last_success_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            DrainOutcomeStatus::Failure => {
                self.failed_batches.fetch_add(1, Ordering::Relaxed);
                self.last_failure_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Ok(mut guard) = self.last_batch.lock() {
            guard.outcome = Some(status);
            guard.applied = Some(applied);
            guard.remaining = Some(remaining);
            guard.duration_ms = Some(duration_ms);
            guard.error = error;
        }
    }

    pub fn snapshot(&self) -> DrainMetricsSnapshot {
        let last = self
            .last_batch
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        DrainMetricsSnapshot {
            total_applied: self.applied.load(Ordering::Relaxed),
            total_batches: self.batches.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_success_ms: to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_outcome: last.outcome,
            last_applied: last.applied,
            last_remaining: last.remaining,
            last_duration_ms: last.duration_ms,
            last_error: last.error,
        }
    }
}

impl Default for DrainMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
