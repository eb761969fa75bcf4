use crate::domain::value_objects::{
    EntityKey, MutationAction, MutationId, MutationPayload, TableName,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending write destined for the remote store. Records are created on
/// remote-write failure and destroyed only after their remote apply
/// succeeded; they are never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutationRecord {
    pub id: MutationId,
    pub table: TableName,
    pub action: MutationAction,
    pub record_key: EntityKey,
    pub payload: MutationPayload,
    pub enqueued_at: DateTime<Utc>,
}

/// A mutation before the queue has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationDraft {
    pub table: TableName,
    pub action: MutationAction,
    pub record_key: EntityKey,
    pub payload: MutationPayload,
}

impl MutationDraft {
    pub fn new(
        table: TableName,
        action: MutationAction,
        record_key: EntityKey,
        payload: MutationPayload,
    ) -> Self {
        Self {
            table,
            action,
            record_key,
            payload,
        }
    }
}
