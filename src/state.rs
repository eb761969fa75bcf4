use crate::application::ports::{ConnectivitySource, ReachabilityProbe, RemoteTables};
use crate::application::services::{ConnectivityMonitor, DataService, SyncService};
use crate::infrastructure::connectivity::{ManualConnectivity, PollingConnectivity};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::{SqliteLocalStore, SqliteSyncQueue};
use crate::infrastructure::remote::PostgrestRemote;
use crate::shared::config::AppConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

enum Signal {
    Manual(Arc<ManualConnectivity>),
    Polling(Arc<PollingConnectivity>),
}

/// Wired sync core: storage, queue, remote routing and the services on top.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: ConnectionPool,
    pub local_store: Arc<SqliteLocalStore>,
    pub sync_queue: Arc<SqliteSyncQueue>,
    pub remote: Arc<RemoteTables>,
    pub sync_service: Arc<SyncService>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub data_service: Arc<DataService>,
    signal: Arc<Signal>,
}

impl AppState {
    /// Builds the state against the configured PostgREST endpoint, if any.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let timeout = config.sync.remote_call_timeout();
        let mut remote = RemoteTables::new(timeout);
        let postgrest = PostgrestRemote::from_config(&config.remote, timeout)?;
        if let Some(postgrest) = &postgrest {
            postgrest.register_known_tables(&mut remote);
        }
        let probe = postgrest.map(|postgrest| Arc::new(postgrest) as Arc<dyn ReachabilityProbe>);
        Self::assemble(config, remote, probe).await
    }

    /// Builds the state with caller-provided remote handlers and a manual
    /// connectivity signal.
    pub async fn with_remote(config: AppConfig, remote: RemoteTables) -> anyhow::Result<Self> {
        Self::assemble(config, remote, None).await
    }

    async fn assemble(
        config: AppConfig,
        remote: RemoteTables,
        probe: Option<Arc<dyn ReachabilityProbe>>,
    ) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;
        ensure_database_dir(&config.database.url)?;

        let pool = ConnectionPool::new(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.connection_timeout),
        )
        .await?;
        pool.migrate().await?;

        let local_store = Arc::new(SqliteLocalStore::new(pool.clone()));
        let sync_queue = Arc::new(SqliteSyncQueue::new(pool.clone()));
        let remote = Arc::new(remote);

        let sync_service = Arc::new(SyncService::new(
            sync_queue.clone(),
            remote.clone(),
            config.sync.drain_budget(),
        ));

        let initially_online = config.connectivity.assume_online;
        let signal = match (config.connectivity.poll_interval(), probe) {
            (Some(interval), Some(probe)) => {
                info!(?interval, "Polling remote for reachability");
                Signal::Polling(PollingConnectivity::start(probe, interval, initially_online))
            }
            _ => Signal::Manual(Arc::new(ManualConnectivity::new(initially_online))),
        };
        let source: Arc<dyn ConnectivitySource> = match &signal {
            Signal::Manual(source) => source.clone(),
            Signal::Polling(source) => source.clone(),
        };

        let connectivity = ConnectivityMonitor::new(source, sync_service.clone());
        let data_service = Arc::new(DataService::new(
            local_store.clone(),
            sync_queue.clone(),
            remote.clone(),
            connectivity.clone(),
            config.sync.auto_sync,
        ));

        info!(database = %config.database.url, "Sync core ready");
        Ok(Self {
            config,
            pool,
            local_store,
            sync_queue,
            remote,
            sync_service,
            connectivity,
            data_service,
            signal: Arc::new(signal),
        })
    }

    /// Starts listening for connectivity changes.
    pub fn initialize(&self) {
        self.connectivity.initialize();
    }

    /// Forwards a platform online/offline event. Ignored when reachability
    /// is polled. Returns whether the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        match self.signal.as_ref() {
            Signal::Manual(source) => source.set_online(online),
            Signal::Polling(_) => false,
        }
    }

    pub async fn shutdown(&self) {
        self.connectivity.shutdown();
        if let Signal::Polling(source) = self.signal.as_ref() {
            source.stop();
        }
        self.pool.close().await;
        info!("Sync core stopped");
    }
}

fn ensure_database_dir(url: &str) -> anyhow::Result<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
