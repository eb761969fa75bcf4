use super::mappers::mutation_record_from_row;
use super::rows::SyncQueueRow;
use crate::application::ports::SyncQueue;
use crate::domain::entities::{MutationDraft, MutationRecord};
use crate::domain::value_objects::MutationId;
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

/// SQLite-backed sync queue. Ids come from an AUTOINCREMENT primary key,
/// so they follow commit order and are never reused.
pub struct SqliteSyncQueue {
    pool: ConnectionPool,
}

impl SqliteSyncQueue {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncQueue for SqliteSyncQueue {
    async fn enqueue(&self, draft: MutationDraft) -> Result<MutationId, AppError> {
        let payload = draft
            .payload
            .to_json_string()
            .map_err(|err| AppError::SerializationError(err.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO sync_queue (table_name, action, record_key, payload, enqueued_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(draft.table.as_str())
        .bind(draft.action.as_str())
        .bind(draft.record_key.as_str())
        .bind(&payload)
        .bind(Utc::now().timestamp_millis())
        .execute(self.pool.get_pool())
        .await?;

        let id = MutationId::new(result.last_insert_rowid()).map_err(AppError::Storage)?;
        info!(
            mutation_id = %id,
            table = %draft.table,
            action = %draft.action,
            "Added mutation to sync queue"
        );
        Ok(id)
    }

    async fn peek_all(&self) -> Result<Vec<MutationRecord>, AppError> {
        let rows = sqlx::query_as::<_, SyncQueueRow>(
            r#"
            SELECT id, table_name, action, record_key, payload, enqueued_at
            FROM sync_queue
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        rows.into_iter().map(mutation_record_from_row).collect()
    }

    async fn dequeue(&self, id: MutationId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sync_queue WHERE id = ?1")
            .bind(id.value())
            .execute(self.pool.get_pool())
            .await?;

        let removed = result.rows_affected() > 0;
        debug!(mutation_id = %id, removed, "Dequeued mutation");
        Ok(removed)
    }

    async fn count(&self) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn clear(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sync_queue")
            .execute(self.pool.get_pool())
            .await?;
        info!(removed = result.rows_affected(), "Sync queue cleared");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{EntityKey, MutationAction, MutationPayload, TableName};
    use serde_json::json;

    async fn setup_queue() -> (SqliteSyncQueue, ConnectionPool) {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        (SqliteSyncQueue::new(pool.clone()), pool)
    }

    fn draft(action: MutationAction, key: &str) -> MutationDraft {
        MutationDraft::new(
            TableName::new("deployments").unwrap(),
            action,
            EntityKey::new(key).unwrap(),
            MutationPayload::new(json!({"deployment_id": key})).unwrap(),
        )
    }

    #[tokio::test]
    async fn first_enqueue_gets_id_one() {
        let (queue, _pool) = setup_queue().await;

        let id = queue
            .enqueue(draft(MutationAction::Create, "d1"))
            .await
            .unwrap();

        assert_eq!(id.value(), 1);
        let pending = queue.peek_all().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].table.as_str(), "deployments");
        assert_eq!(pending[0].action, MutationAction::Create);
        assert_eq!(pending[0].payload.as_json(), &json!({"deployment_id": "d1"}));
    }

    #[tokio::test]
    async fn ids_keep_growing_after_tail_is_dequeued() {
        let (queue, _pool) = setup_queue().await;

        let first = queue
            .enqueue(draft(MutationAction::Create, "d1"))
            .await
            .unwrap();
        let second = queue
            .enqueue(draft(MutationAction::Update, "d1"))
            .await
            .unwrap();
        queue.dequeue(second).await.unwrap();
        let third = queue
            .enqueue(draft(MutationAction::Delete, "d1"))
            .await
            .unwrap();

        assert!(first < second);
        assert!(second < third);
    }

    #[tokio::test]
    async fn peek_all_is_ascending_and_never_merges() {
        let (queue, _pool) = setup_queue().await;

        queue
            .enqueue(draft(MutationAction::Create, "d1"))
            .await
            .unwrap();
        queue
            .enqueue(draft(MutationAction::Update, "d1"))
            .await
            .unwrap();
        queue
            .enqueue(draft(MutationAction::Update, "d1"))
            .await
            .unwrap();

        let pending = queue.peek_all().await.unwrap();
        let actions: Vec<MutationAction> = pending.iter().map(|record| record.action).collect();
        assert_eq!(
            actions,
            vec![
                MutationAction::Create,
                MutationAction::Update,
                MutationAction::Update
            ]
        );
        assert!(pending.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[tokio::test]
    async fn dequeue_removes_exactly_one_record() {
        let (queue, _pool) = setup_queue().await;

        let first = queue
            .enqueue(draft(MutationAction::Create, "d1"))
            .await
            .unwrap();
        queue
            .enqueue(draft(MutationAction::Create, "d2"))
            .await
            .unwrap();

        assert_eq!(queue.count().await.unwrap(), 2);
        assert!(queue.dequeue(first).await.unwrap());
        assert_eq!(queue.count().await.unwrap(), 1);

        assert!(!queue.dequeue(first).await.unwrap());
        assert_eq!(queue.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_empties_the_queue() {
        let (queue, _pool) = setup_queue().await;
        queue
            .enqueue(draft(MutationAction::Create, "d1"))
            .await
            .unwrap();
        queue
            .enqueue(draft(MutationAction::Create, "d2"))
            .await
            .unwrap();

        assert_eq!(queue.clear().await.unwrap(), 2);
        assert_eq!(queue.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn records_survive_on_shared_pool() {
        let (queue, pool) = setup_queue().await;
        queue
            .enqueue(draft(MutationAction::Create, "d1"))
            .await
            .unwrap();

        let reopened = SqliteSyncQueue::new(pool);
        assert_eq!(reopened.count().await.unwrap(), 1);
    }
}
