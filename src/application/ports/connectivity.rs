use async_trait::async_trait;
use tokio::sync::watch;

/// Platform online/offline signal.
pub trait ConnectivitySource: Send + Sync {
    fn current(&self) -> bool;
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Active reachability check, used when the platform offers no signal.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}
