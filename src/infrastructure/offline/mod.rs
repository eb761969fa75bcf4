mod mappers;
pub mod metrics;
mod rows;
pub mod sqlite_queue;
pub mod sqlite_store;

pub use metrics::{DrainMetrics, DrainMetricsSnapshot, DrainOutcomeStatus};
pub use sqlite_queue::SqliteSyncQueue;
pub use sqlite_store::SqliteLocalStore;
