pub mod manual;
pub mod polling;

pub use manual::ManualConnectivity;
pub use polling::PollingConnectivity;
