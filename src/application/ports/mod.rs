pub mod connectivity;
pub mod local_store;
pub mod remote_store;
pub mod sync_queue;

pub use connectivity::{ConnectivitySource, ReachabilityProbe};
pub use local_store::{LocalRecord, LocalStore};
pub use remote_store::{RemoteError, RemoteTable, RemoteTables};
pub use sync_queue::SyncQueue;
