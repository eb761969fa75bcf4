use crate::domain::value_objects::{EntityKey, MutationAction, TableName};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Typed failure of a remote-store call. These are recoverable on the
/// write path and halt a drain batch; they never corrupt local state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("remote record not found: {0}")]
    NotFound(String),
    #[error("no remote handler registered for table {0}")]
    UnknownTable(String),
    #[error("could not decode remote response: {0}")]
    Decode(String),
}

/// CRUD capability of one remote table.
#[async_trait]
pub trait RemoteTable: Send + Sync {
    async fn insert(&self, record: &Value) -> Result<Value, RemoteError>;
    async fn update(&self, key: &EntityKey, partial: &Value) -> Result<Value, RemoteError>;
    async fn delete(&self, key: &EntityKey) -> Result<(), RemoteError>;
    async fn select_all(&self) -> Result<Vec<Value>, RemoteError>;
}

/// Routes a table identifier to its remote handler and bounds every call
/// with the configured timeout.
#[derive(Clone)]
pub struct RemoteTables {
    tables: HashMap<TableName, Arc<dyn RemoteTable>>,
    call_timeout: Duration,
}

impl RemoteTables {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            tables: HashMap::new(),
            call_timeout,
        }
    }

    pub fn register(&mut self, table: TableName, handler: Arc<dyn RemoteTable>) -> &mut Self {
        self.tables.insert(table, handler);
        self
    }

    pub fn with_table(mut self, table: TableName, handler: Arc<dyn RemoteTable>) -> Self {
        self.register(table, handler);
        self
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn is_registered(&self, table: &TableName) -> bool {
        self.tables.contains_key(table)
    }

    pub fn handler(&self, table: &TableName) -> Result<Arc<dyn RemoteTable>, RemoteError> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| RemoteError::UnknownTable(table.to_string()))
    }

    /// Applies one mutation: insert for create, update-by-key for update and
    /// delete-by-key for delete. Returns the stored row when the remote
    /// echoes one.
    pub async fn apply(
        &self,
        table: &TableName,
        action: MutationAction,
        key: &EntityKey,
        payload: &Value,
    ) -> Result<Option<Value>, RemoteError> {
        let handler = self.handler(table)?;
        match action {
            MutationAction::Create => self.bounded(handler.insert(payload)).await.map(Some),
            MutationAction::Update => self.bounded(handler.update(key, payload)).await.map(Some),
            MutationAction::Delete => self.bounded(handler.delete(key)).await.map(|_| None),
        }
    }

    pub async fn select_all(&self, table: &TableName) -> Result<Vec<Value>, RemoteError> {
        let handler = self.handler(table)?;
        self.bounded(handler.select_all()).await
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.call_timeout)),
        }
    }
}
