use super::mappers::local_record_from_row;
use super::rows::LocalRecordRow;
use crate::application::ports::{LocalRecord, LocalStore};
use crate::domain::value_objects::{EntityKey, TableName};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

const UPSERT_RECORD: &str = r#"
    INSERT INTO local_records (table_name, record_key, data, updated_at)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(table_name, record_key) DO UPDATE SET
        data = excluded.data,
        updated_at = excluded.updated_at
"#;

/// SQLite-backed local snapshot of every entity table.
pub struct SqliteLocalStore {
    pool: ConnectionPool,
}

impl SqliteLocalStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn get(&self, table: &TableName, key: &EntityKey) -> Result<Option<Value>, AppError> {
        let data: Option<(String,)> = sqlx::query_as(
            "SELECT data FROM local_records WHERE table_name = ?1 AND record_key = ?2",
        )
        .bind(table.as_str())
        .bind(key.as_str())
        .fetch_optional(self.pool.get_pool())
        .await?;

        data.map(|(raw,)| {
            serde_json::from_str(&raw)
                .map_err(|err| AppError::DeserializationError(err.to_string()))
        })
        .transpose()
    }

    async fn get_all(&self, table: &TableName) -> Result<Vec<LocalRecord>, AppError> {
        let rows = sqlx::query_as::<_, LocalRecordRow>(
            "SELECT record_key, data FROM local_records WHERE table_name = ?1 ORDER BY id ASC",
        )
        .bind(table.as_str())
        .fetch_all(self.pool.get_pool())
        .await?;

        rows.into_iter().map(local_record_from_row).collect()
    }

    async fn put(&self, table: &TableName, record: LocalRecord) -> Result<(), AppError> {
        let data = serde_json::to_string(&record.data)
            .map_err(|err| AppError::SerializationError(err.to_string()))?;

        sqlx::query(UPSERT_RECORD)
            .bind(table.as_str())
            .bind(record.key.as_str())
            .bind(&data)
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    async fn bulk_put(
        &self,
        table: &TableName,
        records: Vec<LocalRecord>,
    ) -> Result<usize, AppError> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.get_pool().begin().await?;

        for record in &records {
            let data = serde_json::to_string(&record.data)
                .map_err(|err| AppError::SerializationError(err.to_string()))?;
            sqlx::query(UPSERT_RECORD)
                .bind(table.as_str())
                .bind(record.key.as_str())
                .bind(&data)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    async fn delete(&self, table: &TableName, key: &EntityKey) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM local_records WHERE table_name = ?1 AND record_key = ?2")
                .bind(table.as_str())
                .bind(key.as_str())
                .execute(self.pool.get_pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn setup_store() -> SqliteLocalStore {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        SqliteLocalStore::new(pool)
    }

    fn table(name: &str) -> TableName {
        TableName::new(name).unwrap()
    }

    fn key(value: &str) -> EntityKey {
        EntityKey::new(value).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_returns_latest_version() {
        let store = setup_store().await;
        let deployments = table("deployments");

        store
            .put(&deployments, LocalRecord::new(key("d1"), json!({"v": 1})))
            .await
            .unwrap();
        store
            .put(&deployments, LocalRecord::new(key("d1"), json!({"v": 2})))
            .await
            .unwrap();

        let stored = store.get(&deployments, &key("d1")).await.unwrap();
        assert_eq!(stored, Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn tables_are_isolated() {
        let store = setup_store().await;

        store
            .put(&table("projects"), LocalRecord::new(key("x"), json!({"p": true})))
            .await
            .unwrap();

        assert!(store.get(&table("locations"), &key("x")).await.unwrap().is_none());
        assert!(store.get_all(&table("locations")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_all_keeps_first_insertion_order_after_overwrite() {
        let store = setup_store().await;
        let locations = table("locations");

        for name in ["a", "b", "c"] {
            store
                .put(&locations, LocalRecord::new(key(name), json!({"name": name})))
                .await
                .unwrap();
        }
        store
            .put(&locations, LocalRecord::new(key("a"), json!({"name": "a2"})))
            .await
            .unwrap();

        let keys: Vec<String> = store
            .get_all(&locations)
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.key.to_string())
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn bulk_put_inserts_and_overwrites() {
        let store = setup_store().await;
        let projects = table("projects");

        store
            .put(&projects, LocalRecord::new(key("p1"), json!({"name": "old"})))
            .await
            .unwrap();

        let written = store
            .bulk_put(
                &projects,
                vec![
                    LocalRecord::new(key("p1"), json!({"name": "new"})),
                    LocalRecord::new(key("p2"), json!({"name": "second"})),
                ],
            )
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            store.get(&projects, &key("p1")).await.unwrap(),
            Some(json!({"name": "new"}))
        );
        assert_eq!(store.get_all(&projects).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let store = setup_store().await;
        let visits = table("maintenance_visits");

        store
            .put(&visits, LocalRecord::new(key("v1"), json!({})))
            .await
            .unwrap();

        assert!(store.delete(&visits, &key("v1")).await.unwrap());
        assert!(!store.delete(&visits, &key("v1")).await.unwrap());
        assert!(store.get(&visits, &key("v1")).await.unwrap().is_none());
    }
}
