use super::SyncEntity;
use crate::domain::value_objects::{EntityKey, TableName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A camera placed at a location for a period of time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    pub deployment_id: EntityKey,
    pub project_id: EntityKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<EntityKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub deployment_start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Camera setup, bait, habitat and other columns the core does not read.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Deployment {
    pub fn draft(
        project_id: EntityKey,
        latitude: f64,
        longitude: f64,
        deployment_start: impl Into<String>,
    ) -> Self {
        Self {
            deployment_id: EntityKey::generate(),
            project_id,
            location_id: None,
            location_name: None,
            latitude,
            longitude,
            deployment_start: deployment_start.into(),
            deployment_end: None,
            camera_id: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    pub fn at_location(mut self, location_id: EntityKey) -> Self {
        self.location_id = Some(location_id);
        self
    }
}

impl SyncEntity for Deployment {
    const TABLE: &'static str = TableName::DEPLOYMENTS;
    const KEY_COLUMN: &'static str = "deployment_id";

    fn key(&self) -> &EntityKey {
        &self.deployment_id
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}
