pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::services::{
    ConnectivityMonitor, DataService, PullOutcome, QueueReason, SyncService, TriggerOutcome,
    WriteOutcome,
};
pub use shared::{AppConfig, AppError};
pub use state::AppState;
