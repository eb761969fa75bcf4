use super::SyncEntity;
use crate::domain::value_objects::{EntityKey, TableName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub location_id: EntityKey,
    pub project_id: EntityKey,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    pub fn draft(
        project_id: EntityKey,
        location_name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            location_id: EntityKey::generate(),
            project_id,
            location_name: location_name.into(),
            latitude,
            longitude,
            location_comments: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl SyncEntity for Location {
    const TABLE: &'static str = TableName::LOCATIONS;
    const KEY_COLUMN: &'static str = "location_id";

    fn key(&self) -> &EntityKey {
        &self.location_id
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}
