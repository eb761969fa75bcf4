use crate::domain::entities::{MutationDraft, MutationRecord};
use crate::domain::value_objects::MutationId;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Ordered, durable log of mutations waiting for the remote store.
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Persists the mutation and returns its id, which is greater than every
    /// id handed out before.
    async fn enqueue(&self, draft: MutationDraft) -> Result<MutationId, AppError>;
    /// All pending records, strictly ascending by id.
    async fn peek_all(&self) -> Result<Vec<MutationRecord>, AppError>;
    /// Removes exactly one record. Unknown ids are a no-op and return false.
    async fn dequeue(&self, id: MutationId) -> Result<bool, AppError>;
    async fn count(&self) -> Result<u64, AppError>;
    /// Drops every pending record. Operator escape hatch only.
    async fn clear(&self) -> Result<u64, AppError>;
}
