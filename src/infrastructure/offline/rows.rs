use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct LocalRecordRow {
    pub record_key: String,
    pub data: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct SyncQueueRow {
    pub id: i64,
    pub table_name: String,
    pub action: String,
    pub record_key: String,
    pub payload: String,
    pub enqueued_at: i64,
}
