pub mod in_memory_remote;

pub use in_memory_remote::{InMemoryRemote, InMemoryTable, RemoteCall};
