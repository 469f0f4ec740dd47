//! CloudStack resources for stackflow
//!
//! This crate instantiates the generic reconciliation core of
//! [`stackflow_cloud`] for concrete CloudStack resources:
//!
//! - **configuration**: global, zone, cluster, storage pool and account
//!   configuration values
//! - **instance_snapshot**: VM snapshots (create, delete, revert, tags)
//! - **vpn_gateway**: the site-to-site VPN gateway of a VPC
//! - **instance_nic_secondaryip**: secondary IPs on a VM's NIC
//!
//! and provides the [`Manifest`] model that describes them, plus the
//! read-only [`configuration_info`] listing.
//!
//! # Example
//!
//! ```ignore
//! use stackflow_cloud::{PollConfig, Reconciler, RunOptions};
//! use stackflow_cloudstack::Manifest;
//!
//! let reconciler = Reconciler::new(gateway, PollConfig::default());
//! for entry in Manifest::load(path)?.entries()? {
//!     let options = RunOptions { poll_async: entry.poll_async, ..RunOptions::default() };
//!     let record = reconciler
//!         .reconcile(entry.resource.as_ref(), &entry.scope, options, entry.state)
//!         .await?;
//! }
//! ```

pub mod error;
pub mod info;
pub mod manifest;
pub mod resources;

pub use error::{ManifestError, Result};
pub use info::configuration_info;
pub use manifest::{Entry, Manifest, ResourceSpec};
pub use resources::{Configuration, NicSecondaryIp, VmSnapshot, VpnGateway};
