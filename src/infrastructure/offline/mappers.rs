use super::rows::{LocalRecordRow, SyncQueueRow};
use crate::application::ports::LocalRecord;
use crate::domain::entities::MutationRecord;
use crate::domain::value_objects::{
    EntityKey, MutationAction, MutationId, MutationPayload, TableName,
};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};

pub fn local_record_from_row(row: LocalRecordRow) -> Result<LocalRecord, AppError> {
    let key = EntityKey::new(row.record_key).map_err(AppError::DeserializationError)?;
    let data = serde_json::from_str(&row.data)
        .map_err(|err| AppError::DeserializationError(err.to_string()))?;
    Ok(LocalRecord::new(key, data))
}

pub fn mutation_record_from_row(row: SyncQueueRow) -> Result<MutationRecord, AppError> {
    let id = MutationId::new(row.id).map_err(AppError::DeserializationError)?;
    let table = TableName::new(row.table_name).map_err(AppError::DeserializationError)?;
    let action = row
        .action
        .parse::<MutationAction>()
        .map_err(AppError::DeserializationError)?;
    let record_key = EntityKey::new(row.record_key).map_err(AppError::DeserializationError)?;
    let payload =
        MutationPayload::from_json_str(&row.payload).map_err(AppError::DeserializationError)?;
    let enqueued_at = timestamp_to_datetime(row.enqueued_at)?;

    Ok(MutationRecord {
        id,
        table,
        action,
        record_key,
        payload,
        enqueued_at,
    })
}

fn timestamp_to_datetime(millis: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        AppError::DeserializationError(format!("Invalid enqueue timestamp: {millis}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_action_is_a_deserialization_error() {
        let row = SyncQueueRow {
            id: 1,
            table_name: "deployments".into(),
            action: "merge".into(),
            record_key: "d1".into(),
            payload: "{}".into(),
            enqueued_at: 0,
        };
        assert!(matches!(
            mutation_record_from_row(row),
            Err(AppError::DeserializationError(_))
        ));
    }
}
