use super::SyncEntity;
use crate::domain::value_objects::{EntityKey, TableName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub project_id: EntityKey,
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Remaining schema columns, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    pub fn draft(project_name: impl Into<String>) -> Self {
        Self {
            project_id: EntityKey::generate(),
            project_name: project_name.into(),
            organization: None,
            description: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl SyncEntity for Project {
    const TABLE: &'static str = TableName::PROJECTS;
    const KEY_COLUMN: &'static str = "project_id";

    fn key(&self) -> &EntityKey {
        &self.project_id
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}
