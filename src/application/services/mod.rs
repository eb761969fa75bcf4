pub mod connectivity_monitor;
pub mod data_service;
pub mod sync_service;

pub use connectivity_monitor::{ConnectivityListener, ConnectivityMonitor, ListenerId};
pub use data_service::{DataService, PullOutcome, QueueReason, WriteOutcome};
pub use sync_service::{
    DrainHalt, DrainReport, HaltReason, SyncService, SyncStatus, TriggerOutcome,
};
