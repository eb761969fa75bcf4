use super::connectivity_monitor::ConnectivityMonitor;
use crate::application::ports::{LocalRecord, LocalStore, RemoteError, RemoteTables, SyncQueue};
use crate::domain::entities::{known_tables, MutationDraft, SyncEntity};
use crate::domain::value_objects::{
    EntityKey, MutationAction, MutationId, MutationPayload, TableName,
};
use crate::shared::error::AppError;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Why a write was parked in the sync queue instead of reaching the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueReason {
    Offline,
    /// Older mutations are still queued; going direct would overtake them.
    QueueBacklog,
    Remote(RemoteError),
}

/// Result of a write. Both variants mean the change is durable locally.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
    Committed(T),
    Queued {
        value: T,
        mutation_id: MutationId,
        reason: QueueReason,
    },
}

impl<T> WriteOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Committed(value) | Self::Queued { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Committed(value) | Self::Queued { value, .. } => value,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub fn mutation_id(&self) -> Option<MutationId> {
        match self {
            Self::Committed(_) => None,
            Self::Queued { mutation_id, .. } => Some(*mutation_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Pulled { count: usize },
    Offline,
    RemoteFailed(RemoteError),
}

enum RemoteAttempt {
    Applied(Option<Value>),
    Skipped(QueueReason),
}

#[derive(Default)]
struct TableLocks {
    locks: Mutex<HashMap<TableName, Arc<AsyncMutex<()>>>>,
}

impl TableLocks {
    async fn lock(&self, table: &TableName) -> Result<OwnedMutexGuard<()>, AppError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| AppError::Internal("table lock registry poisoned".into()))?;
            locks.entry(table.clone()).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }
}

/// Offline-first CRUD over the field-ops tables.
///
/// Online writes go to the remote first and are mirrored locally. When the
/// device is offline, the remote fails, or older mutations are still
/// queued, the write is applied locally and recorded in the sync queue.
/// Writes to one table are serialized so local state and queue order agree.
pub struct DataService {
    local: Arc<dyn LocalStore>,
    queue: Arc<dyn SyncQueue>,
    remote: Arc<RemoteTables>,
    connectivity: Arc<ConnectivityMonitor>,
    sync_on_backlog: bool,
    locks: TableLocks,
}

impl DataService {
    pub fn new(
        local: Arc<dyn LocalStore>,
        queue: Arc<dyn SyncQueue>,
        remote: Arc<RemoteTables>,
        connectivity: Arc<ConnectivityMonitor>,
        sync_on_backlog: bool,
    ) -> Self {
        Self {
            local,
            queue,
            remote,
            connectivity,
            sync_on_backlog,
            locks: TableLocks::default(),
        }
    }

    pub async fn create<E: SyncEntity>(&self, mut entity: E) -> Result<WriteOutcome<E>, AppError> {
        let table = E::table();
        let _guard = self.locks.lock(&table).await?;

        entity.stamp_created(Utc::now());
        let key = entity.key().clone();
        let payload = serde_json::to_value(&entity)?;

        match self
            .attempt_remote(&table, MutationAction::Create, &key, &payload)
            .await?
        {
            RemoteAttempt::Applied(row) => {
                let stored = adopt_remote_row(row, entity);
                self.put_local(&table, &key, &stored).await?;
                info!(table = %table, key = %key, "Created record remotely");
                Ok(WriteOutcome::Committed(stored))
            }
            RemoteAttempt::Skipped(reason) => {
                self.put_local(&table, &key, &entity).await?;
                let mutation_id = self
                    .enqueue(&table, MutationAction::Create, &key, payload)
                    .await?;
                self.after_queued(&reason);
                Ok(WriteOutcome::Queued {
                    value: entity,
                    mutation_id,
                    reason,
                })
            }
        }
    }

    /// Merges `patch` into the stored record. The key column cannot change.
    pub async fn update<E: SyncEntity>(
        &self,
        key: &EntityKey,
        mut patch: Map<String, Value>,
    ) -> Result<WriteOutcome<E>, AppError> {
        let table = E::table();
        let _guard = self.locks.lock(&table).await?;

        let current = self
            .local
            .get(&table, key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{table}/{key}")))?;

        patch.insert(E::KEY_COLUMN.to_string(), Value::String(key.to_string()));
        let merged = merge_object(current, &patch);
        let mut entity: E = serde_json::from_value(merged)
            .map_err(|err| AppError::ValidationError(format!("Invalid update for {table}: {err}")))?;
        let now = Utc::now();
        entity.stamp_updated(now);
        patch.insert("updated_at".to_string(), serde_json::to_value(now)?);
        let payload = Value::Object(patch);

        match self
            .attempt_remote(&table, MutationAction::Update, key, &payload)
            .await?
        {
            RemoteAttempt::Applied(row) => {
                let stored = adopt_remote_row(row, entity);
                self.put_local(&table, key, &stored).await?;
                info!(table = %table, key = %key, "Updated record remotely");
                Ok(WriteOutcome::Committed(stored))
            }
            RemoteAttempt::Skipped(reason) => {
                self.put_local(&table, key, &entity).await?;
                let mutation_id = self
                    .enqueue(&table, MutationAction::Update, key, payload)
                    .await?;
                self.after_queued(&reason);
                Ok(WriteOutcome::Queued {
                    value: entity,
                    mutation_id,
                    reason,
                })
            }
        }
    }

    /// Deleting a key that is not stored locally still succeeds.
    pub async fn delete<E: SyncEntity>(
        &self,
        key: &EntityKey,
    ) -> Result<WriteOutcome<EntityKey>, AppError> {
        let table = E::table();
        let _guard = self.locks.lock(&table).await?;

        let mut body = Map::new();
        body.insert(E::KEY_COLUMN.to_string(), Value::String(key.to_string()));
        let payload = Value::Object(body);

        let attempt = self
            .attempt_remote(&table, MutationAction::Delete, key, &payload)
            .await?;
        let removed = self.local.delete(&table, key).await?;
        debug!(table = %table, key = %key, removed, "Deleted local record");

        match attempt {
            RemoteAttempt::Applied(_) => {
                info!(table = %table, key = %key, "Deleted record remotely");
                Ok(WriteOutcome::Committed(key.clone()))
            }
            RemoteAttempt::Skipped(reason) => {
                let mutation_id = self
                    .enqueue(&table, MutationAction::Delete, key, payload)
                    .await?;
                self.after_queued(&reason);
                Ok(WriteOutcome::Queued {
                    value: key.clone(),
                    mutation_id,
                    reason,
                })
            }
        }
    }

    pub async fn get<E: SyncEntity>(&self, key: &EntityKey) -> Result<Option<E>, AppError> {
        match self.local.get(&E::table(), key).await? {
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
            None => Ok(None),
        }
    }

    /// Local records in first-insertion order.
    pub async fn get_all<E: SyncEntity>(&self) -> Result<Vec<E>, AppError> {
        self.local
            .get_all(&E::table())
            .await?
            .into_iter()
            .map(|record| serde_json::from_value(record.data).map_err(AppError::from))
            .collect()
    }

    /// Replaces local rows with the remote table's rows. Remote wins on
    /// conflict, except for keys with queued mutations, which keep their
    /// local value until the queue drains. Local rows absent remotely are
    /// kept.
    pub async fn pull_table<E: SyncEntity>(&self) -> Result<PullOutcome, AppError> {
        let table = E::table();
        if !self.connectivity.get_online_status() {
            return Ok(PullOutcome::Offline);
        }

        let rows = match self.remote.select_all(&table).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(table = %table, error = %err, "Pull failed");
                return Ok(PullOutcome::RemoteFailed(err));
            }
        };

        let _guard = self.locks.lock(&table).await?;
        let pending: HashSet<EntityKey> = self
            .queue
            .peek_all()
            .await?
            .into_iter()
            .filter(|record| record.table == table)
            .map(|record| record.record_key)
            .collect();

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<E>(row) {
                Ok(entity) if pending.contains(entity.key()) => debug!(
                    table = %table,
                    key = %entity.key(),
                    "Keeping local row with pending mutations"
                ),
                Ok(entity) => {
                    let data = serde_json::to_value(&entity)?;
                    records.push(LocalRecord::new(entity.key().clone(), data));
                }
                Err(err) => warn!(table = %table, error = %err, "Skipping undecodable remote row"),
            }
        }

        let count = self.local.bulk_put(&table, records).await?;
        info!(table = %table, count, "Pulled remote records");
        Ok(PullOutcome::Pulled { count })
    }

    /// Pulls every known table, parents before children.
    pub async fn pull_all(&self) -> Result<Vec<(TableName, PullOutcome)>, AppError> {
        use crate::domain::entities::{Deployment, Location, MaintenanceVisit, Project};

        let mut outcomes = Vec::with_capacity(known_tables().len());
        outcomes.push((Project::table(), self.pull_table::<Project>().await?));
        outcomes.push((Location::table(), self.pull_table::<Location>().await?));
        outcomes.push((Deployment::table(), self.pull_table::<Deployment>().await?));
        outcomes.push((
            MaintenanceVisit::table(),
            self.pull_table::<MaintenanceVisit>().await?,
        ));
        Ok(outcomes)
    }

    /// Pulls one table by name.
    pub async fn pull_named(&self, table: &TableName) -> Result<PullOutcome, AppError> {
        use crate::domain::entities::{Deployment, Location, MaintenanceVisit, Project};

        match table.as_str() {
            TableName::PROJECTS => self.pull_table::<Project>().await,
            TableName::LOCATIONS => self.pull_table::<Location>().await,
            TableName::DEPLOYMENTS => self.pull_table::<Deployment>().await,
            TableName::MAINTENANCE_VISITS => self.pull_table::<MaintenanceVisit>().await,
            other => Err(AppError::NotFound(format!("Unknown table: {other}"))),
        }
    }

    async fn attempt_remote(
        &self,
        table: &TableName,
        action: MutationAction,
        key: &EntityKey,
        payload: &Value,
    ) -> Result<RemoteAttempt, AppError> {
        if !self.connectivity.get_online_status() {
            return Ok(RemoteAttempt::Skipped(QueueReason::Offline));
        }

        if self.queue.count().await? > 0 {
            debug!(table = %table, "Mutations pending, queueing behind them");
            return Ok(RemoteAttempt::Skipped(QueueReason::QueueBacklog));
        }

        match self.remote.apply(table, action, key, payload).await {
            Ok(row) => Ok(RemoteAttempt::Applied(row)),
            Err(err) => {
                warn!(
                    table = %table,
                    key = %key,
                    action = %action,
                    error = %err,
                    "Remote write failed, saving locally"
                );
                Ok(RemoteAttempt::Skipped(QueueReason::Remote(err)))
            }
        }
    }

    /// Asks for a drain once a write has joined an existing backlog, so it
    /// is already in the queue when the drain looks.
    fn after_queued(&self, reason: &QueueReason) {
        if self.sync_on_backlog && *reason == QueueReason::QueueBacklog {
            self.connectivity.request_sync();
        }
    }

    async fn put_local<E: SyncEntity>(
        &self,
        table: &TableName,
        key: &EntityKey,
        entity: &E,
    ) -> Result<(), AppError> {
        let data = serde_json::to_value(entity)?;
        self.local
            .put(table, LocalRecord::new(key.clone(), data))
            .await
    }

    async fn enqueue(
        &self,
        table: &TableName,
        action: MutationAction,
        key: &EntityKey,
        payload: Value,
    ) -> Result<MutationId, AppError> {
        let payload = MutationPayload::new(payload).map_err(AppError::SerializationError)?;
        self.queue
            .enqueue(MutationDraft::new(
                table.clone(),
                action,
                key.clone(),
                payload,
            ))
            .await
    }
}

/// Uses the remote's echo of a row when it decodes, else the local value.
fn adopt_remote_row<E: SyncEntity>(row: Option<Value>, local: E) -> E {
    match row.map(serde_json::from_value::<E>) {
        Some(Ok(remote)) => remote,
        Some(Err(err)) => {
            warn!(error = %err, "Remote echo did not decode, keeping local value");
            local
        }
        None => local,
    }
}

fn merge_object(mut base: Value, patch: &Map<String, Value>) -> Value {
    if let Value::Object(fields) = &mut base {
        for (field, value) in patch {
            fields.insert(field.clone(), value.clone());
        }
        base
    } else {
        Value::Object(patch.clone())
    }
}
