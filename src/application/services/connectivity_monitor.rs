use super::sync_service::{SyncService, TriggerOutcome};
use crate::application::ports::ConnectivitySource;
use crate::shared::error::AppError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub type ConnectivityListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle returned by [`ConnectivityMonitor::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Tracks online status and drains the sync queue every time the device
/// comes back online.
///
/// Listeners run synchronously on the watcher task, in registration order,
/// before any drain starts.
pub struct ConnectivityMonitor {
    source: Arc<dyn ConnectivitySource>,
    sync: Arc<SyncService>,
    online: AtomicBool,
    next_listener: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, ConnectivityListener)>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    pub fn new(source: Arc<dyn ConnectivitySource>, sync: Arc<SyncService>) -> Arc<Self> {
        let online = source.current();
        Arc::new(Self {
            source,
            sync,
            online: AtomicBool::new(online),
            next_listener: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
            watcher: Mutex::new(None),
        })
    }

    /// Starts watching the connectivity source. Calling it again while the
    /// watcher is running has no effect.
    pub fn initialize(self: &Arc<Self>) {
        let Ok(mut watcher) = self.watcher.lock() else {
            return;
        };
        if watcher.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let mut rx = self.source.subscribe();
        let initial = *rx.borrow_and_update();
        self.apply_transition(initial);

        let monitor: Weak<Self> = Arc::downgrade(self);
        *watcher = Some(tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.apply_transition(online);
            }
        }));
        info!(online = initial, "Connectivity monitor started");
    }

    pub fn shutdown(&self) {
        if let Ok(mut watcher) = self.watcher.lock() {
            if let Some(handle) = watcher.take() {
                handle.abort();
                info!("Connectivity monitor stopped");
            }
        }
    }

    pub fn get_online_status(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub async fn is_sync_in_progress(&self) -> bool {
        self.sync.is_syncing().await
    }

    pub fn sync_service(&self) -> &Arc<SyncService> {
        &self.sync
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }
        id
    }

    /// Returns whether the listener was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let Ok(mut listeners) = self.listeners.lock() else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    /// Drains the sync queue if online and nothing is draining already.
    pub async fn trigger_sync(&self) -> Result<TriggerOutcome, AppError> {
        if !self.get_online_status() {
            info!("Offline, sync deferred");
            return Ok(TriggerOutcome::Offline);
        }
        self.sync.drain_pending().await
    }

    /// Starts a drain in the background without waiting for it.
    pub fn request_sync(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            log_outcome(monitor.trigger_sync().await);
        });
    }

    fn apply_transition(self: &Arc<Self>, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online == online {
            return;
        }
        info!(online, "Connectivity changed");
        self.notify(online);

        if online {
            self.request_sync();
        }
    }

    fn notify(&self, online: bool) {
        let listeners: Vec<ConnectivityListener> = match self.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(_, listener)| listener.clone()).collect(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(online);
        }
    }
}

fn log_outcome(outcome: Result<TriggerOutcome, AppError>) {
    match outcome {
        Ok(TriggerOutcome::Drained(report)) if !report.is_complete() => {
            warn!(
                applied = report.applied,
                remaining = report.remaining,
                "Sync stopped early"
            );
        }
        Ok(TriggerOutcome::Drained(report)) => {
            info!(applied = report.applied, "Background sync finished");
        }
        Ok(_) => {}
        Err(err) => error!(error = %err, "Background sync failed"),
    }
}
