//! Resource handlers
//!
//! Each handler is a thin [`stackflow_cloud::ManagedResource`]
//! implementation: which listing finds it, which commands create, update
//! or delete it, and how it is projected.

pub mod configuration;
pub mod secondary_ip;
pub mod snapshot;
pub mod vpn_gateway;

pub use configuration::Configuration;
pub use secondary_ip::NicSecondaryIp;
pub use snapshot::VmSnapshot;
pub use vpn_gateway::VpnGateway;
