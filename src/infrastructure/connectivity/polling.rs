use crate::application::ports::{ConnectivitySource, ReachabilityProbe};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Fallback connectivity signal that polls a reachability probe.
pub struct PollingConnectivity {
    tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollingConnectivity {
    pub fn start(
        probe: Arc<dyn ReachabilityProbe>,
        interval: Duration,
        initially_online: bool,
    ) -> Arc<Self> {
        let (tx, _rx) = watch::channel(initially_online);
        let source = Arc::new(Self {
            tx: tx.clone(),
            task: Mutex::new(None),
        });

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reachable = probe.is_reachable().await;
                let changed = tx.send_if_modified(|current| {
                    if *current == reachable {
                        false
                    } else {
                        *current = reachable;
                        true
                    }
                });
                if changed {
                    info!(online = reachable, "Reachability changed");
                } else {
                    debug!(online = reachable, "Reachability unchanged");
                }
            }
        });

        if let Ok(mut guard) = source.task.lock() {
            *guard = Some(handle);
        }
        source
    }

    pub fn stop(&self) {
        if let Ok(mut guard) = self.task.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

impl ConnectivitySource for PollingConnectivity {
    fn current(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Drop for PollingConnectivity {
    fn drop(&mut self) {
        self.stop();
    }
}
