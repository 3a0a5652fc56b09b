//! Discovery of Roku devices speaking the External Control Protocol (ECP).
//!
//! A [DiscoveryCoordinator] multicasts a discovery request from every local
//! IPv4 interface and notifies its listeners of each device that answers.

mod config;
mod coordinator;
mod device;
mod listener;
mod network;
mod probe;
mod scanner;


pub use config::DiscoveryConfig;
pub use coordinator::DiscoveryCoordinator;
pub use coordinator::DiscoveryError;
pub use coordinator::DiscoverySession;
pub use coordinator::ProbeReport;
pub use device::DeviceDiscovered;
pub use device::RokuDevice;
pub use listener::DiscoveryListener;
pub use network::interface::InterfaceEnumerator;
pub use network::interface::SystemInterfaceEnumerator;
pub use probe::ProbeError;
pub use probe::ProbeStop;
pub use scanner::scan;
pub use scanner::DeviceScan;
pub use tokio_util::sync::CancellationToken;
pub use url::Url;
