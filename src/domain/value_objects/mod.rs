pub mod entity_key;
pub mod mutation_action;
pub mod mutation_id;
pub mod payload;
pub mod table_name;

pub use entity_key::EntityKey;
pub use mutation_action::MutationAction;
pub use mutation_id::MutationId;
pub use payload::MutationPayload;
pub use table_name::TableName;
