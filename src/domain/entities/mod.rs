pub mod deployment;
pub mod location;
pub mod maintenance_visit;
pub mod mutation_record;
pub mod project;

pub use deployment::Deployment;
pub use location::Location;
pub use maintenance_visit::{MaintenanceVisit, VisitType};
pub use mutation_record::{MutationDraft, MutationRecord};
pub use project::Project;

use crate::domain::value_objects::{EntityKey, TableName};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An entity table the sync core can store locally and replicate.
///
/// Implementors serialize to the same JSON shape the remote table uses, so
/// the local snapshot, queued payloads and remote rows are interchangeable.
pub trait SyncEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;

    fn key(&self) -> &EntityKey;

    fn stamp_created(&mut self, now: DateTime<Utc>);

    fn stamp_updated(&mut self, now: DateTime<Utc>);

    fn table() -> TableName {
        TableName::known(Self::TABLE)
    }

    fn spec() -> TableSpec {
        TableSpec {
            name: Self::table(),
            key_column: Self::KEY_COLUMN,
        }
    }
}

/// Routing information for one entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: TableName,
    pub key_column: &'static str,
}

/// Tables known to the field-ops schema, parents before children.
pub fn known_tables() -> Vec<TableSpec> {
    vec![
        Project::spec(),
        Location::spec(),
        Deployment::spec(),
        MaintenanceVisit::spec(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tables_list_parents_first() {
        let names: Vec<String> = known_tables()
            .into_iter()
            .map(|spec| spec.name.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["projects", "locations", "deployments", "maintenance_visits"]
        );
    }
}
