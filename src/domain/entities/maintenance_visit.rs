use super::SyncEntity;
use crate::domain::value_objects::{EntityKey, TableName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitType {
    Deployment,
    Maintenance,
    Retrieval,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceVisit {
    pub visit_id: EntityKey,
    pub deployment_id: EntityKey,
    pub project_id: EntityKey,
    pub visit_date: String,
    pub visit_type: VisitType,
    pub technician_name: String,
    pub camera_functioning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MaintenanceVisit {
    pub fn draft(
        deployment_id: EntityKey,
        project_id: EntityKey,
        visit_date: impl Into<String>,
        visit_type: VisitType,
        technician_name: impl Into<String>,
    ) -> Self {
        Self {
            visit_id: EntityKey::generate(),
            deployment_id,
            project_id,
            visit_date: visit_date.into(),
            visit_type,
            technician_name: technician_name.into(),
            camera_functioning: true,
            visit_notes: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl SyncEntity for MaintenanceVisit {
    const TABLE: &'static str = TableName::MAINTENANCE_VISITS;
    const KEY_COLUMN: &'static str = "visit_id";

    fn key(&self) -> &EntityKey {
        &self.visit_id
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}
