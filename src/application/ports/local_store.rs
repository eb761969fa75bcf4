use crate::domain::value_objects::{EntityKey, TableName};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// One row of a local entity table.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRecord {
    pub key: EntityKey,
    pub data: Value,
}

impl LocalRecord {
    pub fn new(key: EntityKey, data: Value) -> Self {
        Self { key, data }
    }
}

/// Durable per-table key/value storage for entity snapshots.
///
/// Every call is durable before it returns. Failures are fatal for the
/// caller; there is no lower layer to fall back to. Nothing here spans
/// tables atomically.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, table: &TableName, key: &EntityKey) -> Result<Option<Value>, AppError>;
    /// Rows in first-insertion order.
    async fn get_all(&self, table: &TableName) -> Result<Vec<LocalRecord>, AppError>;
    async fn put(&self, table: &TableName, record: LocalRecord) -> Result<(), AppError>;
    async fn bulk_put(&self, table: &TableName, records: Vec<LocalRecord>)
        -> Result<usize, AppError>;
    /// Returns whether a row was removed.
    async fn delete(&self, table: &TableName, key: &EntityKey) -> Result<bool, AppError>;
}
