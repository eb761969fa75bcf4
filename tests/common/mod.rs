pub mod mocks;

use fieldsync::application::ports::SyncQueue;
use fieldsync::domain::entities::Deployment;
use fieldsync::domain::value_objects::EntityKey;
use fieldsync::{AppConfig, AppState};
use mocks::InMemoryRemote;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct OfflineTestContext {
    pub state: AppState,
    pub remote: Arc<InMemoryRemote>,
}

pub fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}?mode=rwc", dir.join("fieldsync.db").display());
    config.connectivity.assume_online = false;
    config.sync.auto_sync = true;
    config
}

pub async fn setup_state(dir: &Path, remote: Arc<InMemoryRemote>) -> OfflineTestContext {
    let state = AppState::with_remote(test_config(dir), remote.remote_tables())
        .await
        .expect("state");
    state.initialize();
    OfflineTestContext { state, remote }
}

pub fn sample_deployment() -> Deployment {
    Deployment::draft(
        EntityKey::new("project-1").expect("project key"),
        -1.2921,
        36.8219,
        "2025-03-01",
    )
}

pub async fn next_report(
    reports: &mut tokio::sync::broadcast::Receiver<fieldsync::application::services::DrainReport>,
) -> fieldsync::application::services::DrainReport {
    tokio::time::timeout(Duration::from_secs(5), reports.recv())
        .await
        .expect("drain report in time")
        .expect("report channel open")
}

/// Polls until the queue is empty, retriggering drains that were skipped
/// or halted.
pub async fn drain_until_empty(state: &AppState) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while state.sync_queue.count().await.expect("queue count") > 0 {
            state.connectivity.trigger_sync().await.expect("trigger sync");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("queue drained in time");
}

pub async fn wait_until_online(state: &AppState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !state.connectivity.get_online_status() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("monitor saw the online event");
}
